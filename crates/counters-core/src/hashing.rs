//! Deterministic index-key formation.
//!
//! A small, directly-testable function per scheme, rather than inlining
//! the hash call at every use site.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha1::{Digest, Sha1};

use crate::index_entry::IndexValueMode;

/// Forms the index key `h` for a given index type and field value.
/// Opaque mode hashes `indexType:value` with SHA1+Base64; transparent
/// mode keeps it as plain, debuggable text.
pub fn index_key(mode: IndexValueMode, index_type: i32, value: &str) -> String {
    let payload = format!("{index_type}:{value}");
    match mode {
        IndexValueMode::Opaque => {
            let digest = Sha1::digest(payload.as_bytes());
            BASE64.encode(digest)
        }
        IndexValueMode::Transparent => payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_is_deterministic() {
        let a = index_key(IndexValueMode::Opaque, 1, "acct-123");
        let b = index_key(IndexValueMode::Opaque, 1, "acct-123");
        assert_eq!(a, b);
    }

    #[test]
    fn opaque_differs_by_index_type() {
        let a = index_key(IndexValueMode::Opaque, 1, "acct-123");
        let b = index_key(IndexValueMode::Opaque, 2, "acct-123");
        assert_ne!(a, b);
    }

    #[test]
    fn transparent_is_readable() {
        let h = index_key(IndexValueMode::Transparent, 7, "acct-123");
        assert_eq!(h, "7:acct-123");
    }

    #[test]
    fn shared_value_shares_opaque_key() {
        // distinct facts with the same indexed value must share `h`
        let a = index_key(IndexValueMode::Opaque, 1, "shared");
        let b = index_key(IndexValueMode::Opaque, 1, "shared");
        assert_eq!(a, b);
    }
}
