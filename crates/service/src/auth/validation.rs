//! Input normalisation and field checks, run before any collaborator is touched.

use super::errors::{AuthError, FieldError};

const MAX_LEN: usize = 255;

fn check_len(errors: &mut Vec<FieldError>, field: &'static str, value: &str, min: usize) {
    let n = value.chars().count();
    if n < min {
        errors.push(FieldError::new(field, format!("must be at least {min} characters")));
    } else if n > MAX_LEN {
        errors.push(FieldError::new(field, format!("must be at most {MAX_LEN} characters")));
    }
}

fn finish<T>(errors: Vec<FieldError>, value: T) -> Result<T, AuthError> {
    if errors.is_empty() { Ok(value) } else { Err(AuthError::Validation(errors)) }
}

pub fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else { return false };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty() && !host.starts_with('.'),
        None => false,
    }
}

/// Lowercased `(username, email)` or every field error found.
///
/// ```
/// use service::auth::validation::registration;
/// let (u, e) = registration("Alice", "Alice@Example.com", "hunter2!!").unwrap();
/// assert_eq!((u.as_str(), e.as_str()), ("alice", "alice@example.com"));
/// assert!(registration("a!", "nope", "short").is_err());
/// ```
pub fn registration(username: &str, email: &str, password: &str) -> Result<(String, String), AuthError> {
    let username = username.trim().to_lowercase();
    let email = email.trim().to_lowercase();
    let mut errors = Vec::new();

    check_len(&mut errors, "username", &username, 3);
    if !username.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) {
        errors.push(FieldError::new("username", "only letters and digits are allowed"));
    }
    if email.chars().count() > MAX_LEN {
        errors.push(FieldError::new("email", format!("must be at most {MAX_LEN} characters")));
    } else if !is_email(&email) {
        errors.push(FieldError::new("email", "invalid email address"));
    }
    check_len(&mut errors, "password", password, 8);

    finish(errors, (username, email))
}

/// Login or forgot-password identifier: an email or a username, lowercased.
pub fn identifier(field: &'static str, raw: &str) -> Result<String, AuthError> {
    let value = raw.trim().to_lowercase();
    let mut errors = Vec::new();
    check_len(&mut errors, field, &value, 3);
    finish(errors, value)
}

pub fn password(field: &'static str, raw: &str) -> Result<(), AuthError> {
    let mut errors = Vec::new();
    check_len(&mut errors, field, raw, 8);
    finish(errors, ())
}

pub fn session_id(raw: &str) -> Result<(), AuthError> {
    if raw.trim().is_empty() {
        return Err(AuthError::field("sessionId", "required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(err: AuthError) -> Vec<&'static str> {
        match err {
            AuthError::Validation(errs) => errs.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn registration_reports_every_bad_field() {
        let err = registration("ab", "not-an-email", "1234567").unwrap_err();
        assert_eq!(fields(err), vec!["username", "email", "password"]);
    }

    #[test]
    fn username_rejects_symbols_after_lowercasing() {
        assert!(registration("Bob_99", "bob@example.com", "password1").is_err());
        assert_eq!(registration("BOB99", "bob@example.com", "password1").unwrap().0, "bob99");
    }

    #[test]
    fn email_shapes() {
        assert!(is_email("a@b.co"));
        assert!(!is_email("a@b"));
        assert!(!is_email("@b.co"));
        assert!(!is_email("a b@c.de"));
        assert!(!is_email("a@@b.co"));
        assert!(!is_email("a@.co"));
    }

    #[test]
    fn length_bounds() {
        let long = "x".repeat(256);
        assert!(password("password", &long).is_err());
        assert!(password("password", &"x".repeat(255)).is_ok());
        assert!(identifier("usernameOrEmail", "ab").is_err());
        assert_eq!(identifier("usernameOrEmail", " Alice ").unwrap(), "alice");
        assert!(session_id("   ").is_err());
    }
}
