//! Content fingerprints: SHA-256 over the UTF-8 bytes of normalized text,
//! rendered as lowercase hex. Used only as an equality oracle between runs.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Length of a rendered fingerprint (64 hex chars).
pub const FINGERPRINT_LEN: usize = 64;

pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(FINGERPRINT_LEN);
    for b in digest.iter() {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn same_input_same_digest() {
        let a = fingerprint("Convocatoria abierta\nInscripciones hasta el viernes");
        let b = fingerprint("Convocatoria abierta\nInscripciones hasta el viernes");
        assert_eq!(a, b);
        assert_eq!(a.len(), FINGERPRINT_LEN);
    }

    #[test]
    fn known_vector() {
        // sha256("abc")
        assert_eq!(
            fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn single_byte_differences_diverge() {
        let base = "The quick brown fox jumps over the lazy dog".to_string();
        let mut seen = HashSet::new();
        seen.insert(fingerprint(&base));
        for i in 0..base.len() {
            let mut bytes = base.clone().into_bytes();
            bytes[i] = if bytes[i] == b'x' { b'y' } else { b'x' };
            let variant = String::from_utf8(bytes).unwrap();
            assert!(seen.insert(fingerprint(&variant)), "collision at byte {i}");
        }
        // trailing newline is a difference too
        assert!(seen.insert(fingerprint(&format!("{base}\n"))));
    }

    #[test]
    fn many_distinct_inputs_distinct_digests() {
        let digests: HashSet<String> = (0..2_000).map(|i| fingerprint(&format!("doc {i}"))).collect();
        assert_eq!(digests.len(), 2_000);
    }
}
