/// Minimum length of a new admin password.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Validate a new password against its confirmation.
/// Returns the offending field and message; a mismatch is reported before length.
pub fn validate_new_password(new_password: &str, confirm_password: &str) -> Option<(&'static str, String)> {
    if new_password != confirm_password {
        return Some(("confirm_password", "Passwords do not match".to_string()));
    }
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Some((
            "new_password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    None
}
