use crate::auth::AuthError;
use crate::auth::Credentials;
use crate::auth::RememberMe;
use chrono::DateTime;
use chrono::Utc;

/// Authentication state of one caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    username: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Signs in with a username and password.
    pub fn login(&mut self, credentials: &Credentials, username: &str, password: &str) -> Result<(), AuthError> {
        if !credentials.check(username, password) {
            log::warn!("Failed sign-in for '{}'", username);
            return Err(AuthError::InvalidCredentials);
        }
        log::info!("'{}' signed in", username);
        self.username = Some(username.to_owned());
        Ok(())
    }

    /// Restores an unauthenticated session from a remember-me token; an authenticated session is
    /// left as it is. Returns whether the session is authenticated afterwards.
    pub fn restore(&mut self, remember_me: &RememberMe, token: Option<&str>, now: DateTime<Utc>) -> bool {
        if self.is_authenticated() {
            return true;
        }
        if let Some(username) = token.filter(|token| !token.is_empty()).and_then(|token| remember_me.verify(token, now)) {
            log::debug!("Session restored for '{}'", username);
            self.username = Some(username);
        }
        self.is_authenticated()
    }

    /// Fails with [`AuthError::Unauthorized`] unless signed in
    pub fn require(&self) -> Result<&str, AuthError> {
        self.username().ok_or(AuthError::Unauthorized)
    }

    pub fn logout(&mut self) {
        self.username = None;
    }
}
