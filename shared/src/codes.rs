//! Join codes: short, human-enterable capability tokens.

use uuid::Uuid;

pub const MAX_CODE_LEN: usize = 6;

/// Trims and uppercases a code as entered by a user
pub fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Returns the normalized code, or None when it can never be a valid code
pub fn parse(code: &str) -> Option<String> {
    let code = normalize(code);
    if code.is_empty() || code.len() > MAX_CODE_LEN {
        return None;
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(code)
}

/// Generates a random candidate code. Callers check it against the store.
pub fn generate() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(MAX_CODE_LEN)
        .collect::<String>()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_uppercases() {
        assert_eq!(parse("  ab12c \n"), Some("AB12C".to_string()));
    }

    #[test]
    fn parse_rejects_bad_codes() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   "), None);
        assert_eq!(parse("ABCDEFG"), None);
        assert_eq!(parse("AB-12"), None);
    }

    #[test]
    fn generated_codes_are_valid() {
        for _ in 0..50 {
            let code = generate();
            assert_eq!(code.len(), MAX_CODE_LEN);
            assert_eq!(parse(&code), Some(code.clone()));
        }
    }
}
