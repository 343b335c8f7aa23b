use crate::auth::ct_eq;
use crate::auth::AuthError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use hmac::Hmac;
use hmac::Mac;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Secret used when none is configured; deployments are expected to override it
pub const DEFAULT_REMEMBER_ME_SECRET: &str = "change-this-secret-to-a-long-random-string";
/// Token lifetime
pub const REMEMBER_ME_DAYS: i64 = 30;

/// Issues and verifies remember-me tokens.
///
/// A token is `base64("<username>|<expires>|<signature>")` where `expires` is a Unix timestamp
/// in seconds and `signature` is the lowercase hex HMAC-SHA256 of `"<username>|<expires>"`.
/// Tokens carry everything needed to verify them, so no server-side storage is involved.
#[derive(Clone)]
pub struct RememberMe {
    secret: String,
}

impl RememberMe {
    pub fn new(secret: impl Into<String>) -> RememberMe {
        RememberMe { secret: secret.into() }
    }

    /// Creates a token for `username` that expires [`REMEMBER_ME_DAYS`] after `now`.
    pub fn issue(&self, username: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let expires_at = (now + Duration::days(REMEMBER_ME_DAYS)).timestamp();
        let payload = format!("{username}|{expires_at}");
        let signature = self.sign(&payload)?;
        Ok(STANDARD.encode(format!("{payload}|{signature}")))
    }

    /// Returns the username a token was issued for, or `None` when the token is malformed,
    /// expired or signed with another secret.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Option<String> {
        let raw = STANDARD.decode(token.trim()).ok()?;
        let raw = String::from_utf8(raw).ok()?;
        let parts: Vec<&str> = raw.split('|').collect();
        let [username, expires_at, signature] = parts.as_slice() else {
            return None;
        };
        if expires_at.is_empty() || !expires_at.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if expires_at.parse::<i64>().ok()? < now.timestamp() {
            log::debug!("Remember-me token for '{}' has expired", username);
            return None;
        }
        let expected = self.sign(&format!("{username}|{expires_at}")).ok()?;
        if !ct_eq(expected.as_bytes(), signature.as_bytes()) {
            log::warn!("Remember-me token for '{}' has a bad signature", username);
            return None;
        }
        Some(username.to_string())
    }

    fn sign(&self, payload: &str) -> Result<String, AuthError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|_| AuthError::SecretError)?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl Default for RememberMe {
    fn default() -> Self {
        RememberMe::new(DEFAULT_REMEMBER_ME_SECRET)
    }
}
