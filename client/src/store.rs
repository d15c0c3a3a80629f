use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kernel::{
    AuthReply, Credentials, FileRecord, OrderUpdate, Registration, SharedFileReply,
    SharedLinkReply, TagsUpdate,
};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::json;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::error::{ErrorKind, SyncError, TransportError};
use crate::resource::Resource;

pub type TransportResult<T> = std::result::Result<T, TransportError>;

const LIST_PATH: &str = "stats";
const UPLOAD_PATH: &str = "files/upload";
const UPDATE_TAGS_PATH: &str = "files/files/update-tags";
const DELETE_PATH: &str = "files/file";
const SHARE_PATH: &str = "files/share";
const ORDER_PATH: &str = "files/update-order";
const VIEW_PATH: &str = "files/view";
const LOGIN_PATH: &str = "auth/login";
const REGISTER_PATH: &str = "auth/register";

const UPLOAD_FILES_FIELD: &str = "files";
const UPLOAD_TAGS_FIELD: &str = "tags";

/// Remote authority over an owner's files.
///
/// Every owner-scoped call takes the bearer token explicitly so one store
/// can serve several sessions.
#[async_trait]
pub trait RemoteFileStore: Send + Sync {
    async fn list_files(&self, token: &str) -> TransportResult<Vec<FileRecord>>;

    async fn upload(&self, files: &[PathBuf], tags: &[String], token: &str) -> TransportResult<()>;

    async fn update_tags(
        &self,
        filename: &str,
        tags: &[String],
        token: &str,
    ) -> TransportResult<FileRecord>;

    async fn delete_file(&self, filename: &str, token: &str) -> TransportResult<()>;

    /// Creates a public link for the record and returns it.
    async fn generate_link(&self, id: &str, token: &str) -> TransportResult<String>;

    async fn persist_order(&self, order: &[String], token: &str) -> TransportResult<()>;

    /// Resolves a public share id to the URL of the file content.
    async fn resolve_shared(&self, shared_id: &str) -> TransportResult<String>;
}

/// [`RemoteFileStore`] over the REST API.
#[derive(Clone, Debug)]
pub struct HttpFileStore {
    base: Resource,
    client: Client,
}

impl HttpFileStore {
    pub fn new(uri: &str) -> Result<Self, SyncError> {
        Self::with_client(uri, Client::new())
    }

    pub fn with_client(uri: &str, client: Client) -> Result<Self, SyncError> {
        let base = Resource::new(uri).map_err(|source| SyncError::InvalidUri {
            uri: uri.to_string(),
            source,
        })?;
        Ok(Self { base, client })
    }

    /// Signs in and returns the bearer token.
    pub async fn login(&self, credentials: &Credentials) -> Result<String, SyncError> {
        let request = self.client.post(self.endpoint(LOGIN_PATH).to_string());
        let reply: AuthReply = send_json(request.json(credentials))
            .await
            .map_err(|e| SyncError::remote(ErrorKind::AuthFailed, e))?;
        tracing::info!("signed in as {}", credentials.email);
        Ok(reply.token)
    }

    pub async fn register(&self, registration: &Registration) -> Result<(), SyncError> {
        if registration.password != registration.confirm_password {
            return Err(SyncError::remote(
                ErrorKind::AuthFailed,
                TransportError::Invalid("passwords do not match".to_string()),
            ));
        }
        let request = self.client.post(self.endpoint(REGISTER_PATH).to_string());
        send(request.json(registration))
            .await
            .map_err(|e| SyncError::remote(ErrorKind::AuthFailed, e))?;
        tracing::info!("registered {}", registration.email);
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Resource {
        let mut resource = self.base.clone();
        resource.append_path(path);
        resource
    }

    fn endpoint_with(&self, path: &str, segment: &str) -> Resource {
        let mut resource = self.endpoint(path);
        resource.append_segment(segment);
        resource
    }
}

#[async_trait]
impl RemoteFileStore for HttpFileStore {
    async fn list_files(&self, token: &str) -> TransportResult<Vec<FileRecord>> {
        let resource = self.endpoint(LIST_PATH);
        tracing::debug!("GET {resource}");
        send_json(self.client.get(resource.to_string()).bearer_auth(token)).await
    }

    async fn upload(&self, files: &[PathBuf], tags: &[String], token: &str) -> TransportResult<()> {
        let mut form = reqwest::multipart::Form::new();
        for path in files {
            form = form.part(UPLOAD_FILES_FIELD, file_part(path).await?);
        }
        form = form.text(UPLOAD_TAGS_FIELD, tags.join(","));

        let resource = self.endpoint(UPLOAD_PATH);
        tracing::debug!("POST {resource} with {} file(s)", files.len());
        send(
            self.client
                .post(resource.to_string())
                .bearer_auth(token)
                .multipart(form),
        )
        .await
        .map(|_| ())
    }

    async fn update_tags(
        &self,
        filename: &str,
        tags: &[String],
        token: &str,
    ) -> TransportResult<FileRecord> {
        let body = TagsUpdate {
            filename: filename.to_string(),
            tags: tags.to_vec(),
        };
        let resource = self.endpoint(UPDATE_TAGS_PATH);
        tracing::debug!("POST {resource} {filename}: {tags:?}");
        send_json(
            self.client
                .post(resource.to_string())
                .bearer_auth(token)
                .json(&body),
        )
        .await
    }

    async fn delete_file(&self, filename: &str, token: &str) -> TransportResult<()> {
        let resource = self.endpoint_with(DELETE_PATH, filename);
        tracing::debug!("DELETE {resource}");
        send(self.client.delete(resource.to_string()).bearer_auth(token))
            .await
            .map(|_| ())
    }

    async fn generate_link(&self, id: &str, token: &str) -> TransportResult<String> {
        let resource = self.endpoint_with(SHARE_PATH, id);
        tracing::debug!("POST {resource}");
        let reply: SharedLinkReply = send_json(
            self.client
                .post(resource.to_string())
                .bearer_auth(token)
                .json(&json!({})),
        )
        .await?;
        if reply.shared_link.is_empty() {
            return Err(TransportError::Other("empty shared link".to_string()));
        }
        Ok(reply.shared_link)
    }

    async fn persist_order(&self, order: &[String], token: &str) -> TransportResult<()> {
        let body = OrderUpdate {
            order: order.to_vec(),
        };
        let resource = self.endpoint(ORDER_PATH);
        tracing::debug!("POST {resource} with {} id(s)", order.len());
        send(
            self.client
                .post(resource.to_string())
                .bearer_auth(token)
                .json(&body),
        )
        .await
        .map(|_| ())
    }

    async fn resolve_shared(&self, shared_id: &str) -> TransportResult<String> {
        let resource = self.endpoint_with(VIEW_PATH, shared_id);
        tracing::debug!("GET {resource}");
        let reply: SharedFileReply = send_json(self.client.get(resource.to_string())).await?;
        Ok(reply.url)
    }
}

async fn file_part(path: &Path) -> TransportResult<reqwest::multipart::Part> {
    let io_error = |source| TransportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| TransportError::Invalid(format!("{} is not a file", path.display())))?;

    let f = File::open(path).await.map_err(io_error)?;
    let meta = f.metadata().await.map_err(io_error)?;
    let stream = ReaderStream::new(f);
    let stream = reqwest::Body::wrap_stream(stream);
    Ok(reqwest::multipart::Part::stream_with_length(stream, meta.len()).file_name(file_name))
}

async fn send(request: RequestBuilder) -> TransportResult<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status { status, body })
    }
}

async fn send_json<T: serde::de::DeserializeOwned>(request: RequestBuilder) -> TransportResult<T> {
    let response = send(request).await?;
    Ok(response.json().await?)
}
