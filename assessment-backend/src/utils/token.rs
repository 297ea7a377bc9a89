use rand::{thread_rng, Rng};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const FALLBACK_PREFIX: &str = "MEX";

fn random_chars(length: usize) -> String {
    let mut rng = thread_rng();
    (0..length)
        .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
        .collect()
}

/// Voucher code: eight characters from `A-Z0-9`, hyphenated after the fourth.
pub fn generate_credit_code() -> String {
    let raw = random_chars(8);
    format!("{}-{}", &raw[..4], &raw[4..])
}

/// First three letters of the name, or `MEX` when they are not all ASCII
/// letters.
pub fn company_code_prefix(name: &str) -> String {
    let head: String = name.trim().chars().take(3).collect::<String>().to_uppercase();
    if head.chars().count() == 3 && head.chars().all(|c| c.is_ascii_uppercase()) {
        head
    } else {
        FALLBACK_PREFIX.to_string()
    }
}

/// Tenant access code, e.g. `ACM-4821`.
pub fn generate_company_code(name: &str) -> String {
    let suffix: u16 = thread_rng().gen_range(1000..=9999);
    format!("{}-{}", company_code_prefix(name), suffix)
}

/// Codes are compared trimmed and uppercased everywhere.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_code_has_hyphen_at_fifth_position() {
        for _ in 0..50 {
            let code = generate_credit_code();
            assert_eq!(code.len(), 9);
            assert_eq!(code.as_bytes()[4], b'-');
            assert!(code
                .chars()
                .filter(|c| *c != '-')
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn company_code_uses_name_prefix_or_fallback() {
        assert_eq!(company_code_prefix("acme logistics"), "ACM");
        assert_eq!(company_code_prefix("3M Mexico"), "MEX");
        assert_eq!(company_code_prefix("Ñandú SA"), "MEX");
        assert_eq!(company_code_prefix("Io"), "MEX");

        let code = generate_company_code("Bimbo");
        let (prefix, digits) = code.split_once('-').unwrap();
        assert_eq!(prefix, "BIM");
        let n: u16 = digits.parse().unwrap();
        assert!((1000..=9999).contains(&n));
    }

    #[test]
    fn codes_are_normalized_for_lookup() {
        assert_eq!(normalize_code("  acm-1234 "), "ACM-1234");
    }
}
