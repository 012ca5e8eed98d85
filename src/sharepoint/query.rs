//! SharePoint REST URL construction

use crate::error::BridgeError;
use std::fmt;
use std::str::FromStr;

/// Structures the bridge can query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Structure {
    Lists,
}

impl Structure {
    /// Every structure the bridge accepts
    pub const ALL: &'static [Structure] = &[Structure::Lists];

    pub fn name(&self) -> &'static str {
        match self {
            Structure::Lists => "Lists",
        }
    }

    /// REST path appended to the server URL
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            Structure::Lists => "/_api/web/lists",
        }
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Structure {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Structure::ALL
            .iter()
            .find(|structure| structure.name() == s)
            .copied()
            .ok_or_else(|| BridgeError::InvalidStructure(s.to_string()))
    }
}

/// Build the request URL for `structure`, appending the parsed filter.
///
/// The fragment is percent-encoded, then `%3D` and `%26` are turned back into
/// `=` and `&`: SharePoint reads those as query-string structure, while
/// spaces, quotes and parentheses must stay encoded.
pub fn build_url(server_url: &str, structure: Structure, query: Option<&str>) -> String {
    let mut url = format!(
        "{}{}?",
        server_url.trim_end_matches('/'),
        structure.endpoint_path()
    );

    if let Some(query) = query {
        url.push_str(&urlencoding::encode(query));
    }

    url.replace("%3D", "=").replace("%26", "&")
}
