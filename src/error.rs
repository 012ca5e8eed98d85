//! Bridge error types
//!
//! Every adapter operation returns one of these variants. Transport and XML
//! failures keep their detail out of the displayed message; the detail is
//! logged where the failure happens.

use thiserror::Error;

/// Errors surfaced by the SharePoint bridge operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Invalid Structure: '{0}' is not a valid structure")]
    InvalidStructure(String),

    #[error("Unable to make a connection to properly execute the query to SharePoint")]
    Connection,

    #[error("Parsing of the XML response failed")]
    XmlParse { detail: String },

    #[error("Multiple results matched an expected single match query ({matches} entries)")]
    AmbiguousResult { matches: usize },

    #[error("Unable to parse qualification: {0}")]
    QueryParse(String),
}

impl BridgeError {
    /// Diagnostic detail carried alongside the generic message, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            BridgeError::XmlParse { detail } => Some(detail),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
