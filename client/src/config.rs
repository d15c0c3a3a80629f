use std::path::{Path, PathBuf};
use std::{env, fs, io};

use directories::ProjectDirs;

use crate::sync::{LinkRefresh, OrderFailurePolicy, SyncOptions};

pub const DEFAULT_API_URI: &str = "http://localhost:5002/api";

pub const API_URI_VAR: &str = "FILESYNC_API_URI";
pub const TOKEN_VAR: &str = "FILESYNC_TOKEN";
pub const ORDER_FAILURE_VAR: &str = "FILESYNC_ORDER_FAILURE";
pub const LINK_REFRESH_VAR: &str = "FILESYNC_LINK_REFRESH";
pub const TOKEN_FILE_VAR: &str = "FILESYNC_TOKEN_FILE";

const TOKEN_FILE_NAME: &str = "token";

/// Bearer token saved by `login` so later commands can run without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `token` under the user's config directory, `None` when the platform
    /// has no home directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "filesync").map(|d| d.config_dir().join(TOKEN_FILE_NAME))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved token. Missing, unreadable and blank files all mean no token.
    #[must_use]
    pub fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Some(content.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("cannot read token from {}: {e}", self.path.display());
                None
            }
        }
    }

    pub fn save(&self, token: &str) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, token.trim())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        tracing::debug!("token saved to {}", self.path.display());
        Ok(())
    }

    /// Removes the saved token. Returns whether there was one.
    pub fn clear(&self) -> io::Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Settings taken from the environment. Command line flags override them.
#[derive(Debug, Clone)]
pub struct Config {
    pub uri: String,
    pub token: Option<String>,
    /// Where `login` keeps the token between runs.
    pub token_file: Option<PathBuf>,
    pub options: SyncOptions,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok()).with_saved_token()
    }

    /// Falls back to the saved token when none was set explicitly.
    #[must_use]
    pub fn with_saved_token(mut self) -> Self {
        if self.token.is_none() {
            self.token = self.token_file().and_then(|f| f.load());
        }
        self
    }

    #[must_use]
    pub fn token_file(&self) -> Option<TokenFile> {
        self.token_file.clone().map(TokenFile::new)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let uri = lookup(API_URI_VAR).unwrap_or_else(|| String::from(DEFAULT_API_URI));
        let token = lookup(TOKEN_VAR).filter(|t| !t.trim().is_empty());
        let token_file = lookup(TOKEN_FILE_VAR)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .or_else(TokenFile::default_path);

        let order_failure = match lookup(ORDER_FAILURE_VAR).as_deref().map(str::trim) {
            None | Some("" | "keep") => OrderFailurePolicy::Keep,
            Some("rollback") => OrderFailurePolicy::Rollback,
            Some(other) => {
                tracing::warn!("{ORDER_FAILURE_VAR}: unknown policy {other}, keeping local order");
                OrderFailurePolicy::Keep
            }
        };
        let link_refresh = match lookup(LINK_REFRESH_VAR).as_deref().map(str::trim) {
            None | Some("" | "patch") => LinkRefresh::Patch,
            Some("reload") => LinkRefresh::Reload,
            Some(other) => {
                tracing::warn!("{LINK_REFRESH_VAR}: unknown mode {other}, patching in place");
                LinkRefresh::Patch
            }
        };

        Self {
            uri,
            token,
            token_file,
            options: SyncOptions {
                order_failure,
                link_refresh,
            },
        }
    }
}
