//! Input sanitization and format validation.
//!
//! All functions are total over any input string: they either return the
//! cleaned value or an `InputError`, never panic.

use thiserror::Error;

pub const EMAIL_MAX_LEN: usize = 254;
pub const PHONE_MAX_LEN: usize = 20;
pub const DEFAULT_MAX_LEN: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Input too long. Maximum {max} characters allowed")]
    TooLong { max: usize },
    #[error("Invalid {field} format")]
    InvalidFormat { field: &'static str },
}

/// Strip control characters (keeping `\n`, `\r`, `\t`), enforce `max_length`
/// on what remains, then trim surrounding whitespace.
pub fn sanitize_string(value: &str, max_length: usize) -> Result<String, InputError> {
    let sanitized: String = value
        .chars()
        .filter(|c| (*c as u32) >= 32 || matches!(c, '\n' | '\r' | '\t'))
        .collect();

    if sanitized.chars().count() > max_length {
        return Err(InputError::TooLong { max: max_length });
    }

    Ok(sanitized.trim().to_string())
}

/// Validate `local@domain.tld` and return the address lower-cased.
pub fn validate_email(value: &str) -> Result<String, InputError> {
    let email = sanitize_string(value, EMAIL_MAX_LEN)?;
    if is_email(&email) {
        Ok(email.to_lowercase())
    } else {
        Err(InputError::InvalidFormat { field: "email" })
    }
}

fn is_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-'));
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'));
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());

    local_ok && host_ok && tld_ok
}

/// Normalize a phone number to digits with an optional leading `+` and check
/// it has 1 to 15 digits, the first non-zero.
pub fn validate_phone(value: &str) -> Result<String, InputError> {
    let phone: String = sanitize_string(value, PHONE_MAX_LEN)?
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    let digits = phone.strip_prefix('+').unwrap_or(&phone);
    let valid = (1..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0');

    if valid {
        Ok(phone)
    } else {
        Err(InputError::InvalidFormat { field: "phone" })
    }
}
