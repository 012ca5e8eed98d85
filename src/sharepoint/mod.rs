//! SharePoint module
//!
//! Query translation, HTTP transport and Atom response mapping for the
//! SharePoint list REST API

pub mod adapter;
pub mod feed;
pub mod query;
pub mod transport;

#[cfg(test)]
pub(crate) mod fixtures;

pub use adapter::SharepointAdapter;
pub use feed::{AtomDocument, AtomFeedParser, FeedParser, FieldLookup};
pub use query::{build_url, Structure};
pub use transport::{basic_auth_header, HttpTransport, Transport, DEFAULT_TIMEOUT};
