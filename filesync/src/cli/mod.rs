use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ArgMatches;
use client::config::Config;
use client::{FileList, HttpFileStore, LinkRefresh, OrderFailurePolicy};

pub mod bugreport;
pub mod files;
pub mod version;

pub const VERSION_SUBCOMMAND: &str = "version";
pub const VERSION_DESCRIPTION: &str = "Display the version and build information";

pub const BUGREPORT_SUBCOMMAND: &str = "bugreport";
pub const BUGREPORT_DESCRIPTION: &str = "Collect information about the system and the environment for bug reports";

pub const LOGIN_SUBCOMMAND: &str = "login";
pub const LOGIN_DESCRIPTION: &str = "Sign in, save the bearer token and print it";

pub const LOGOUT_SUBCOMMAND: &str = "logout";
pub const LOGOUT_DESCRIPTION: &str = "Forget the saved bearer token";

pub const REGISTER_SUBCOMMAND: &str = "register";
pub const REGISTER_DESCRIPTION: &str = "Create an account";

pub const LIST_SUBCOMMAND: &str = "list";
pub const LIST_DESCRIPTION: &str = "List your files in their saved order";

pub const UPLOAD_SUBCOMMAND: &str = "upload";
pub const UPLOAD_DESCRIPTION: &str = "Upload one or more files";

pub const TAG_SUBCOMMAND: &str = "tag";
pub const TAG_DESCRIPTION: &str = "Change the tags of a file";
pub const TAG_ADD_SUBCOMMAND: &str = "add";
pub const TAG_ADD_DESCRIPTION: &str = "Add a tag to a file";
pub const TAG_REMOVE_SUBCOMMAND: &str = "remove";
pub const TAG_REMOVE_DESCRIPTION: &str = "Remove a tag from a file";

pub const DELETE_SUBCOMMAND: &str = "delete";
pub const DELETE_DESCRIPTION: &str = "Delete a file";

pub const SHARE_SUBCOMMAND: &str = "share";
pub const SHARE_DESCRIPTION: &str = "Generate a public link for a file";

pub const MOVE_SUBCOMMAND: &str = "move";
pub const MOVE_DESCRIPTION: &str = "Move a file onto the position of another one";

pub const VIEW_SUBCOMMAND: &str = "view";
pub const VIEW_DESCRIPTION: &str = "Resolve a public share id to the file URL";

/// Connection settings of one command run: environment first, flags on top.
pub struct Session {
    pub config: Config,
}

impl Session {
    pub fn new(matches: &ArgMatches) -> Self {
        let mut config = Config::from_env();
        if let Some(uri) = matches.get_one::<String>("uri") {
            config.uri.clone_from(uri);
        }
        if let Some(token) = matches.get_one::<String>("token") {
            config.token = Some(token.clone());
        }
        if matches.get_flag("rollback") {
            config.options.order_failure = OrderFailurePolicy::Rollback;
        }
        if matches.get_flag("reload-after-share") {
            config.options.link_refresh = LinkRefresh::Reload;
        }
        tracing::debug!("using API at {}", config.uri);
        Self { config }
    }

    pub fn store(&self) -> Result<HttpFileStore> {
        Ok(HttpFileStore::new(&self.config.uri)?)
    }

    /// Opens the owner's list and loads it.
    pub async fn open(&self) -> Result<FileList> {
        let token = self.config.token.clone().with_context(|| {
            format!(
                "no token: sign in with `login`, pass --token or set {}",
                client::config::TOKEN_VAR
            )
        })?;
        let list = FileList::new(Arc::new(self.store()?), token, self.config.options);
        list.load().await?;
        Ok(list)
    }
}
