use rand::Rng;

/// Random hex string of `num_bytes` bytes (twice that many hex characters).
/// Used for access tokens, option identifiers and passcodes.
pub fn random_hex_string(rng: &mut impl Rng, num_bytes: usize) -> String {
    let mut buf = vec![0u8; num_bytes];
    rng.fill(&mut buf[..]);
    hex::encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn hex_string_has_expected_length() {
        let mut rng = StdRng::seed_from_u64(7);
        let s = random_hex_string(&mut rng, 16);
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
