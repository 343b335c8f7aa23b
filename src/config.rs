use crate::auth::credentials::DEFAULT_USERNAME;
use crate::auth::remember_me::DEFAULT_REMEMBER_ME_SECRET;
use crate::auth::Credentials;
use crate::auth::RememberMe;
use std::path::PathBuf;

/// Default directory of the rooms snapshot
pub const DEFAULT_DATA_DIR: &str = "data";
/// Default directory of archived uploads
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";

/// Everything the service needs, resolved once at start-up and passed explicitly.
#[derive(Clone, Debug)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub remember_me_secret: String,
    pub credentials: Credentials,
}

impl Settings {
    /// Settings rooted at `root`, with default secret and no password
    pub fn in_dir(root: impl Into<PathBuf>) -> Settings {
        let root = root.into();
        Settings {
            data_dir: root.join(DEFAULT_DATA_DIR),
            uploads_dir: root.join(DEFAULT_UPLOADS_DIR),
            ..Settings::default()
        }
    }

    pub fn remember_me(&self) -> RememberMe {
        if self.remember_me_secret == DEFAULT_REMEMBER_ME_SECRET {
            log::warn!("Remember-me tokens are signed with the built-in secret; set REMEMBER_ME_SECRET");
        }
        RememberMe::new(self.remember_me_secret.clone())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            uploads_dir: PathBuf::from(DEFAULT_UPLOADS_DIR),
            remember_me_secret: DEFAULT_REMEMBER_ME_SECRET.to_owned(),
            credentials: Credentials::new(DEFAULT_USERNAME, None),
        }
    }
}
