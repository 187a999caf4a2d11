//! Access token lookup
//!
//! The user's access token is read from the HR_ACCESS_TOKEN environment variable
//! (or passed on the command line). Nothing is written to disk.

use std::env;

pub const ACCESS_TOKEN_ENV: &str = "HR_ACCESS_TOKEN";

/// Get the access token from environment variable
///
/// Returns the value of HR_ACCESS_TOKEN if set and non-empty, otherwise None.
pub fn get_access_token() -> Option<String> {
    env::var(ACCESS_TOKEN_ENV).ok().filter(|k| !k.trim().is_empty())
}

pub fn has_access_token() -> bool {
    get_access_token().is_some()
}

/// Explicit token first, then the environment.
pub fn resolve_access_token(explicit: Option<&str>) -> Option<String> {
    explicit
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(get_access_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_from_environment() {
        // Save original state
        let original = env::var(ACCESS_TOKEN_ENV).ok();

        unsafe {
            env::set_var(ACCESS_TOKEN_ENV, "jwt-123");
        }
        assert_eq!(get_access_token(), Some("jwt-123".to_string()));
        assert!(has_access_token());
        assert_eq!(resolve_access_token(Some("cli-jwt")), Some("cli-jwt".to_string()));
        assert_eq!(resolve_access_token(Some("  ")), Some("jwt-123".to_string()));

        unsafe {
            env::set_var(ACCESS_TOKEN_ENV, "");
        }
        assert_eq!(get_access_token(), None);
        assert!(!has_access_token());

        unsafe {
            env::remove_var(ACCESS_TOKEN_ENV);
        }
        assert_eq!(resolve_access_token(None), None);

        // Restore original state
        unsafe {
            match original {
                Some(value) => env::set_var(ACCESS_TOKEN_ENV, value),
                None => env::remove_var(ACCESS_TOKEN_ENV),
            }
        }
    }
}
