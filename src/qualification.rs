//! Qualification parsing
//!
//! Turns a templated SharePoint filter (`$filter=Title eq '<%= parameter["Name"] %>'`)
//! into a concrete query fragment by substituting bound parameter values.

use crate::error::{BridgeError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Placeholder syntax shared by the bridge adapter family
const PARAMETER_PATTERN: &str = r#"<%=\s*parameter\["(.*?)"\]\s*%>"#;

const PLACEHOLDER_OPEN: &str = "<%=";

fn parameter_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(PARAMETER_PATTERN).expect("parameter pattern is valid"))
}

/// Parser for SharePoint qualification templates
#[derive(Debug, Clone, Copy, Default)]
pub struct QualificationParser;

impl QualificationParser {
    pub fn new() -> Self {
        Self
    }

    /// Substitute parameters into `template`.
    ///
    /// Returns `Ok(None)` when no template was given, which means an
    /// unfiltered listing. Values are inserted verbatim; URL encoding is the
    /// query builder's job.
    pub fn parse(
        &self,
        template: Option<&str>,
        parameters: &HashMap<String, String>,
    ) -> Result<Option<String>> {
        let Some(template) = template else {
            return Ok(None);
        };

        let mut parsed = String::with_capacity(template.len());
        let mut last = 0;

        for captures in parameter_regex().captures_iter(template) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };

            let literal = &template[last..whole.start()];
            check_literal(literal)?;
            parsed.push_str(literal);

            let value = parameters.get(name.as_str()).ok_or_else(|| {
                BridgeError::QueryParse(format!(
                    "the '{}' parameter was referenced but not provided",
                    name.as_str()
                ))
            })?;
            parsed.push_str(value);
            last = whole.end();
        }

        let tail = &template[last..];
        check_literal(tail)?;
        parsed.push_str(tail);

        Ok(Some(parsed))
    }
}

/// Template text between placeholders must not open another placeholder
fn check_literal(literal: &str) -> Result<()> {
    match literal.find(PLACEHOLDER_OPEN) {
        Some(pos) => Err(BridgeError::QueryParse(format!(
            "unterminated parameter reference near '{}'",
            &literal[pos..]
        ))),
        None => Ok(()),
    }
}
