use crate::auth::ct_eq;

/// Login used when none is configured
pub const DEFAULT_USERNAME: &str = "admin";

/// The one account allowed to sign in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    /// `None` disables password sign-in entirely
    password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: Option<String>) -> Credentials {
        Credentials {
            username: username.into(),
            password: password.filter(|password| !password.is_empty()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Checks a login attempt. Both fields are compared in constant time and always both
    /// compared, so timing does not tell which one was wrong.
    pub fn check(&self, username: &str, password: &str) -> bool {
        let Some(expected) = &self.password else {
            log::warn!("Sign-in attempted but no password is configured");
            return false;
        };
        let username_matches = ct_eq(self.username.as_bytes(), username.as_bytes());
        let password_matches = ct_eq(expected.as_bytes(), password.as_bytes());
        username_matches & password_matches
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Credentials::new(DEFAULT_USERNAME, None)
    }
}
