#![warn(clippy::unwrap_in_result)]
#![warn(clippy::unwrap_used)]

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Represents one uploaded file as known to the client.
///
/// The remote store assigns `id` and owns `views`. A record is addressed
/// by `id` for sharing and ordering and by `filename` for tag updates
/// and deletion, so both are unique within one owner's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileRecord {
    /// Opaque identifier assigned by the remote store
    #[serde(rename = "_id")]
    pub id: String,
    /// Display name, unique among the owner's files
    pub filename: String,
    /// Tags attached to the file, without duplicates
    #[serde(default)]
    pub tags: Vec<String>,
    /// Number of times the file was viewed through its share link
    #[serde(default)]
    pub views: u64,
    /// Public link, absent until generated
    #[serde(
        rename = "sharedLink",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub shared_link: Option<String>,
}

impl FileRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            tags: vec![],
            views: 0,
            shared_link: None,
        }
    }

    #[must_use]
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Request body that replaces the whole tag set of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TagsUpdate {
    pub filename: String,
    pub tags: Vec<String>,
}

/// Request body that persists the full order of an owner's files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderUpdate {
    /// Record ids, first displayed first
    pub order: Vec<String>,
}

/// Reply of the share endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SharedLinkReply {
    #[serde(rename = "sharedLink")]
    pub shared_link: String,
}

/// Reply of the public view endpoint: where the shared file content lives.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SharedFileReply {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
}

/// Reply of the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthReply {
    pub token: String,
}
