//! SharePoint Bridge Library
//!
//! Bridge adapter that turns qualification queries into SharePoint list REST
//! calls and maps the Atom feed responses back into bridge records.

pub mod bridge;
pub mod config;
pub mod error;
pub mod qualification;
pub mod rpc;
pub mod sharepoint;

pub use bridge::{BridgeAdapter, BridgeRequest, Record, RecordList};
pub use config::{AdapterConfig, Config, ConfigError, Credentials};
pub use error::BridgeError;
pub use qualification::QualificationParser;
pub use sharepoint::{FieldLookup, SharepointAdapter, Structure};
