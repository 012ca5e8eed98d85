//! Pagination metadata normalization
//!
//! Search results hand the caller's paging hints back with the defaults
//! filled in. Values are otherwise opaque to the bridge.

use super::Metadata;

pub const PAGE_SIZE: &str = "pageSize";
pub const PAGE_NUMBER: &str = "pageNumber";
pub const OFFSET: &str = "offset";

const DEFAULT_PAGE_SIZE: &str = "0";
const DEFAULT_PAGE_NUMBER: &str = "1";
const DEFAULT_OFFSET: &str = "0";

/// Fill in `pageSize`, `pageNumber` and `offset` when missing or blank
pub fn normalize_pagination_metadata(metadata: &Metadata) -> Metadata {
    let mut normalized = metadata.clone();

    fill_default(&mut normalized, PAGE_SIZE, DEFAULT_PAGE_SIZE);
    fill_default(&mut normalized, PAGE_NUMBER, DEFAULT_PAGE_NUMBER);

    if is_blank(normalized.get(OFFSET)) {
        let offset = computed_offset(&normalized).unwrap_or_else(|| DEFAULT_OFFSET.to_string());
        normalized.insert(OFFSET.to_string(), offset);
    }

    normalized
}

fn fill_default(metadata: &mut Metadata, key: &str, default: &str) {
    if is_blank(metadata.get(key)) {
        metadata.insert(key.to_string(), default.to_string());
    }
}

fn is_blank(value: Option<&String>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn computed_offset(metadata: &Metadata) -> Option<String> {
    let size: u64 = metadata.get(PAGE_SIZE)?.trim().parse().ok()?;
    let number: u64 = metadata.get(PAGE_NUMBER)?.trim().parse().ok()?;
    let offset = number.checked_sub(1)?.checked_mul(size)?;
    Some(offset.to_string())
}
