//! Email normalisation and syntax check.
//!
//! The check is deliberately loose: one `@`, no whitespace, and a dot in the
//! domain part with something on both sides of it.

use crate::error::ValidationError;

/// Trim and lowercase an email address.
pub fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Normalise `email` after checking its syntax.
pub fn parse(email: &str) -> Result<String, ValidationError> {
    if is_valid(email) {
        Ok(normalize(email))
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_addresses() {
        assert!(is_valid("maria@example.com"));
        assert!(is_valid("  juan.dela.cruz@mail.example.ph "));
        assert!(is_valid("a@b.c"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["", "plain", "@example.com", "a@", "a@b", "a@.com", "a@b.", "a b@c.d", "a@b@c.d"] {
            assert!(!is_valid(bad), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn parse_normalises() {
        assert_eq!(parse(" Maria@Example.COM ").unwrap(), "maria@example.com");
        assert_eq!(parse("nope"), Err(ValidationError::InvalidEmail));
    }
}
