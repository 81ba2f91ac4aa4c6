const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Renders a non-negative id in lowercase base 36, no padding.
pub fn encode(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(13);
    while n > 0 {
        digits.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    digits.iter().rev().map(|&d| char::from(d)).collect()
}

/// Parses a base-36 token. Accepts either letter case, rejects empty input,
/// signs and overflow.
pub fn decode(token: &str) -> Option<u64> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    u64::from_str_radix(token, 36).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(encode(0), "0");
        assert_eq!(encode(9), "9");
        assert_eq!(encode(10), "a");
        assert_eq!(encode(35), "z");
        assert_eq!(encode(36), "10");
        assert_eq!(encode(1_295), "zz");
        assert_eq!(encode(1_000_000), "lfls");
        assert_eq!(encode(u64::MAX), "3w5e11264sgsf");
    }

    #[test]
    fn test_encode_is_never_empty() {
        for n in [0, 1, 36, 1 << 32, u64::MAX] {
            let token = encode(n);
            assert!(!token.is_empty());
            assert!(token.bytes().all(|b| DIGITS.contains(&b)));
        }
    }

    #[test]
    fn test_decode_inverts_encode() {
        for n in [0, 1, 35, 36, 470_575, 9_876_543_210, u64::MAX] {
            assert_eq!(decode(&encode(n)), Some(n));
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode(""), None);
        assert_eq!(decode("-1"), None);
        assert_eq!(decode("+1"), None);
        assert_eq!(decode("a b"), None);
        assert_eq!(decode("$1"), None);
        // one past u64::MAX
        assert_eq!(decode("3w5e11264sgsg"), None);
    }

    #[test]
    fn test_decode_is_case_insensitive() {
        assert_eq!(decode("LFLS"), Some(1_000_000));
    }
}
