//! Content fingerprints.

/// Hex fingerprint of `data`, `len` characters long (max 64).
///
/// Used for stable output filenames, e.g. `a1b2c3d4e5f60718.html`.
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(data: &T, len: usize) -> String {
    let digest = blake3::hash(data.as_ref());
    let mut hex = hex::encode(digest.as_bytes());
    hex.truncate(len);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_and_truncated() {
        let a = fingerprint("/notes/plan.md", 16);
        assert_eq!(a.len(), 16);
        assert_eq!(a, fingerprint("/notes/plan.md", 16));
        assert_ne!(a, fingerprint("/notes/other.md", 16));
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fingerprint("x", 100).len(), 64);
    }
}
