//! Registration input validation.

/// Validate an email address: `local@domain.tld` with a non-empty local
/// part, a dotted domain, and an alphabetic TLD of at least two characters.
pub fn validate_email(email: &str) -> crate::Result<()> {
    let invalid = || crate::Error::InvalidEmail(email.to_string());

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || email.contains(' ') {
        return Err(invalid());
    }
    if !local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
    {
        return Err(invalid());
    }

    let (name, tld) = domain.rsplit_once('.').ok_or_else(invalid)?;
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(invalid());
    }
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }
    Ok(())
}

/// Validate password strength: at least 8 characters, containing both a
/// letter and a digit.
pub fn validate_password(password: &str) -> crate::Result<()> {
    if password.len() < 8 {
        return Err(crate::Error::WeakPassword(
            "must be at least 8 characters".to_string(),
        ));
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(crate::Error::WeakPassword(
            "must contain both letters and digits".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_reasonable_emails() {
        for email in [
            "alice@x.com",
            "bob.smith@example.co.uk",
            "u+tag@sub.domain.org",
            "a_b%c@host-name.io",
        ] {
            validate_email(email).unwrap();
        }
    }

    #[test]
    fn rejects_malformed_emails() {
        for email in [
            "",
            "no-at-sign",
            "@x.com",
            "a@",
            "a@nodot",
            "a@x.c",
            "a@x.c0m",
            "a b@x.com",
        ] {
            assert!(validate_email(email).is_err(), "{email:?} should be invalid");
        }
    }

    #[test]
    fn password_policy() {
        validate_password("password123").unwrap();
        assert!(validate_password("short1").is_err());
        assert!(validate_password("alllowercase").is_err());
        assert!(validate_password("12345678").is_err());
    }
}
