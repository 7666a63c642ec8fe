//! Order-preserving deduplication of raw connection URIs.

use std::collections::HashSet;

/// Remove duplicate URIs while preserving first-seen order.
///
/// Identity is the full original string, remark included: two links that
/// differ only in their `#remark` are distinct entries. Runs before
/// normalization, on the raw subscription lines.
pub fn dedupe(uris: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(uris.len());
    let mut unique = Vec::with_capacity(uris.len());

    for uri in uris {
        if seen.insert(uri.clone()) {
            unique.push(uri);
        }
    }

    unique
}
