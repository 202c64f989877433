//! Short code derivation.

use md5::{Digest, Md5};

/// Length of every short code, in hex characters.
pub const CODE_LEN: usize = 6;

/// Derive the short code for a property name: the first six hex characters
/// of its MD5 digest.
///
/// The digest is used for stable spreading only. Distinct names can share a
/// prefix; callers decide what to do about that.
#[must_use]
pub fn short_code(property_name: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(property_name.as_bytes());
    let digest = hasher.finalize();

    let mut code = hex::encode(digest);
    code.truncate(CODE_LEN);
    code
}
