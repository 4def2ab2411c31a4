//! Shared utility functions.

use sha2::{Digest, Sha256};

/// Length of the content hash embedded in asset file names.
pub const HASH_LEN: usize = 8;

/// Convert a slug to title case.
///
/// Splits on `-` and `_`, capitalizes each word.
/// "getting-started" -> "Getting Started"
/// "api_reference" -> "Api Reference"
pub fn title_case(s: &str) -> String {
    s.split(['-', '_'])
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Short SHA-256 content hash for asset file names.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = format!("{:x}", Sha256::digest(bytes));
    digest[..HASH_LEN].to_string()
}
