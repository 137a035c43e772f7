use crate::graphql::types::FieldError;

/// Registration validation. Pure; reports the first violated rule for each
/// field rather than stopping at the first bad field overall.
pub fn validate_registration(username: &str, email: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if !email.contains('@') {
        errors.push(FieldError::new("email", "Invalid email"));
    }

    if username.chars().count() < 3 {
        errors.push(FieldError::new(
            "username",
            "Username must be at least 3 characters",
        ));
    } else if username.contains('@') {
        errors.push(FieldError::new("username", "Invalid Username"));
    }

    if password.chars().count() < 3 {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 3 characters",
        ));
    }

    errors
}
