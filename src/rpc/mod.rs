//! Bridge RPC host
//!
//! Exposes the adapter's count / retrieve / search operations over
//! JSON-RPC 2.0

pub mod protocol;
mod server;

pub use protocol::*;
pub use server::{BridgeServer, METHODS};
