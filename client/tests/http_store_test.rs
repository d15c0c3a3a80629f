use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use client::error::TransportError;
use client::{
    resolve_shared_file, ErrorKind, FileList, HttpFileStore, RemoteFileStore, SyncError,
    SyncOptions,
};
use kernel::{
    AuthReply, Credentials, FileRecord, OrderUpdate, Registration, SharedFileReply,
    SharedLinkReply, TagsUpdate,
};
use serial_test::serial;
use test_context::{test_context, AsyncTestContext};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

const TOKEN: &str = "owner-token";
const EMAIL: &str = "owner@example.com";
const PASSWORD: &str = "hunter2";

/// What the stub remote store knows.
#[derive(Default)]
struct Remote {
    files: Vec<FileRecord>,
    orders: Vec<Vec<String>>,
    uploads: Vec<(String, usize)>,
    upload_tags: Vec<String>,
    shares: HashMap<String, String>,
    registered: Vec<String>,
    fail_orders: bool,
}

type Shared = Arc<Mutex<Remote>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "missing token").into_response()
}

async fn list_files(State(remote): State<Shared>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let files = remote.lock().unwrap().files.clone();
    Json(files).into_response()
}

async fn upload(
    State(remote): State<Shared>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut received = vec![];
    let mut tags = String::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.unwrap_or_default();
        if name == "files" {
            received.push((file_name, data.len()));
        } else if name == "tags" {
            tags = String::from_utf8_lossy(&data).into_owned();
        }
    }

    let mut r = remote.lock().unwrap();
    for (file_name, _) in &received {
        let id = format!("id{}", r.files.len() + 1);
        let tags: Vec<String> = tags
            .split(',')
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        r.files.push(FileRecord::new(id, file_name.clone()).with_tags(tags));
    }
    r.uploads.extend(received);
    r.upload_tags.push(tags);
    (StatusCode::CREATED, Json(serde_json::json!({"message": "ok"}))).into_response()
}

async fn update_tags(
    State(remote): State<Shared>,
    headers: HeaderMap,
    Json(update): Json<TagsUpdate>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut r = remote.lock().unwrap();
    match r.files.iter_mut().find(|f| f.filename == update.filename) {
        Some(record) => {
            record.tags = update.tags;
            Json(record.clone()).into_response()
        }
        None => (StatusCode::NOT_FOUND, "no such file").into_response(),
    }
}

async fn delete_file(
    State(remote): State<Shared>,
    headers: HeaderMap,
    Path(filename): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut r = remote.lock().unwrap();
    let before = r.files.len();
    r.files.retain(|f| f.filename != filename);
    if r.files.len() == before {
        (StatusCode::NOT_FOUND, "no such file").into_response()
    } else {
        Json(serde_json::json!({"message": "deleted"})).into_response()
    }
}

async fn share(
    State(remote): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut r = remote.lock().unwrap();
    let shared_id = Uuid::new_v4().to_string();
    let link = format!("http://localhost/view/{shared_id}");
    let Some(record) = r.files.iter_mut().find(|f| f.id == id) else {
        return (StatusCode::NOT_FOUND, "no such file").into_response();
    };
    record.shared_link = Some(link.clone());
    let url = format!("http://cdn.example.com/{}", record.filename);
    r.shares.insert(shared_id, url);
    Json(SharedLinkReply { shared_link: link }).into_response()
}

async fn update_order(
    State(remote): State<Shared>,
    headers: HeaderMap,
    Json(update): Json<OrderUpdate>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut r = remote.lock().unwrap();
    if r.fail_orders {
        return (StatusCode::INTERNAL_SERVER_ERROR, "order store down").into_response();
    }
    let mut ordered = Vec::with_capacity(r.files.len());
    for id in &update.order {
        if let Some(f) = r.files.iter().find(|f| &f.id == id) {
            ordered.push(f.clone());
        }
    }
    r.files = ordered;
    r.orders.push(update.order);
    Json(serde_json::json!({"message": "order saved"})).into_response()
}

async fn view(State(remote): State<Shared>, Path(shared_id): Path<String>) -> Response {
    match remote.lock().unwrap().shares.get(&shared_id) {
        Some(url) => Json(SharedFileReply { url: url.clone() }).into_response(),
        None => (StatusCode::NOT_FOUND, "not shared").into_response(),
    }
}

async fn login(Json(credentials): Json<Credentials>) -> Response {
    if credentials.email == EMAIL && credentials.password == PASSWORD {
        Json(AuthReply {
            token: TOKEN.to_string(),
        })
        .into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "invalid credentials").into_response()
    }
}

async fn register(State(remote): State<Shared>, Json(registration): Json<Registration>) -> Response {
    remote.lock().unwrap().registered.push(registration.email);
    StatusCode::CREATED.into_response()
}

fn routes(remote: Shared) -> Router {
    Router::new()
        .route("/api/stats", get(list_files))
        .route("/api/files/upload", post(upload))
        .route("/api/files/files/update-tags", post(update_tags))
        .route("/api/files/file/:filename", delete(delete_file))
        .route("/api/files/share/:id", post(share))
        .route("/api/files/update-order", post(update_order))
        .route("/api/files/view/:shared_id", get(view))
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .with_state(remote)
}

struct RemoteStoreContext {
    uri: String,
    remote: Shared,
    root: PathBuf,
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl RemoteStoreContext {
    fn seed(&self, files: &[(&str, &str)]) {
        self.remote.lock().unwrap().files = files
            .iter()
            .map(|(id, name)| FileRecord::new(*id, *name))
            .collect();
    }

    fn store(&self) -> HttpFileStore {
        HttpFileStore::new(&self.uri).unwrap()
    }

    fn list(&self) -> FileList {
        FileList::new(Arc::new(self.store()), TOKEN, SyncOptions::default())
    }

    fn remote_ids(&self) -> Vec<String> {
        self.remote
            .lock()
            .unwrap()
            .files
            .iter()
            .map(|f| f.id.clone())
            .collect()
    }
}

fn ids(list: &FileList) -> Vec<String> {
    list.items().into_iter().map(|r| r.id).collect()
}

impl AsyncTestContext for RemoteStoreContext {
    async fn setup() -> RemoteStoreContext {
        let root = env::temp_dir().join(format!("filesync_test_{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&root).await.unwrap();

        let remote = Shared::default();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (send, recv) = oneshot::channel::<()>();
        let app = routes(remote.clone());
        let join = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    recv.await.unwrap_or_default();
                })
                .await
                .unwrap();
        });

        RemoteStoreContext {
            uri: format!("http://127.0.0.1:{port}/api"),
            remote,
            root,
            shutdown: send,
            join,
        }
    }

    async fn teardown(self) {
        self.shutdown.send(()).unwrap_or_default();
        self.join.await.unwrap_or_default();
        tokio::fs::remove_dir_all(self.root)
            .await
            .unwrap_or_default();
    }
}

#[test_context(RemoteStoreContext)]
#[tokio::test]
#[serial]
async fn load_returns_server_order(ctx: &mut RemoteStoreContext) {
    // Arrange
    ctx.seed(&[("2", "b.png"), ("1", "a.png"), ("3", "c.png")]);
    let list = ctx.list();

    // Act
    list.load().await.unwrap();

    // Assert
    assert_eq!(ids(&list), vec!["2", "1", "3"]);
}

#[test_context(RemoteStoreContext)]
#[tokio::test]
#[serial]
async fn wrong_token_is_fetch_failure(ctx: &mut RemoteStoreContext) {
    // Arrange
    ctx.seed(&[("1", "a.png")]);
    let list = FileList::new(Arc::new(ctx.store()), "stolen", SyncOptions::default());

    // Act
    let result = list.load().await;

    // Assert
    match result {
        Err(SyncError::Remote {
            kind,
            source: TransportError::Status { status, .. },
        }) => {
            assert_eq!(kind, ErrorKind::FetchFailed);
            assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(list.items().is_empty());
    assert_eq!(list.last_error(), Some(ErrorKind::FetchFailed));
}

#[test_context(RemoteStoreContext)]
#[tokio::test]
#[serial]
async fn reorder_persists_full_order(ctx: &mut RemoteStoreContext) {
    // Arrange
    ctx.seed(&[("1", "a.png"), ("2", "b.png"), ("3", "c.png")]);
    let list = ctx.list();
    list.load().await.unwrap();

    // Act
    let sync = list.reorder("3", "1").unwrap().unwrap();
    let local = ids(&list);
    sync.wait().await.unwrap();

    // Assert
    assert_eq!(local, vec!["3", "1", "2"]);
    assert_eq!(ctx.remote_ids(), vec!["3", "1", "2"]);
    assert_eq!(
        ctx.remote.lock().unwrap().orders,
        vec![vec!["3".to_string(), "1".to_string(), "2".to_string()]]
    );
}

#[test_context(RemoteStoreContext)]
#[tokio::test]
#[serial]
async fn reorder_failure_is_reported(ctx: &mut RemoteStoreContext) {
    // Arrange
    ctx.seed(&[("1", "a.png"), ("2", "b.png")]);
    let list = ctx.list();
    list.load().await.unwrap();
    ctx.remote.lock().unwrap().fail_orders = true;

    // Act
    let result = list.reorder("2", "1").unwrap().unwrap().wait().await;

    // Assert
    assert_eq!(result.unwrap_err().kind(), Some(ErrorKind::OrderSyncFailed));
    assert_eq!(ids(&list), vec!["2", "1"]);
    assert_eq!(ctx.remote_ids(), vec!["1", "2"]);
}

#[test_context(RemoteStoreContext)]
#[tokio::test]
#[serial]
async fn tags_round_trip_through_server(ctx: &mut RemoteStoreContext) {
    // Arrange
    ctx.seed(&[("1", "a.png")]);
    let list = ctx.list();
    list.load().await.unwrap();

    // Act
    list.add_tag("a.png", "x").await.unwrap();
    list.add_tag("a.png", "x").await.unwrap();
    list.add_tag("a.png", "y").await.unwrap();
    list.remove_tag("a.png", "x").await.unwrap();

    // Assert
    assert_eq!(list.find_by_id("1").unwrap().tags, vec!["y".to_string()]);
    assert_eq!(
        ctx.remote.lock().unwrap().files[0].tags,
        vec!["y".to_string()]
    );
}

#[test_context(RemoteStoreContext)]
#[tokio::test]
#[serial]
async fn delete_encodes_filename(ctx: &mut RemoteStoreContext) {
    // Arrange
    ctx.seed(&[("1", "my cat #1.png"), ("2", "b.png")]);
    let list = ctx.list();
    list.load().await.unwrap();

    // Act
    list.delete("my cat #1.png").await.unwrap();

    // Assert
    assert_eq!(ids(&list), vec!["2"]);
    assert_eq!(ctx.remote_ids(), vec!["2"]);
}

#[test_context(RemoteStoreContext)]
#[tokio::test]
#[serial]
async fn shared_link_resolves_publicly(ctx: &mut RemoteStoreContext) {
    // Arrange
    ctx.seed(&[("1", "a.png")]);
    let list = ctx.list();
    list.load().await.unwrap();

    // Act
    let link = list.generate_link("1").await.unwrap();
    let shared_id = link.rsplit('/').next().unwrap().to_string();
    let url = resolve_shared_file(&ctx.store(), &shared_id).await.unwrap();

    // Assert
    assert_eq!(list.find_by_id("1").unwrap().shared_link, Some(link));
    assert_eq!(url, "http://cdn.example.com/a.png");
}

#[test_context(RemoteStoreContext)]
#[tokio::test]
#[serial]
async fn unknown_share_fails_resolution(ctx: &mut RemoteStoreContext) {
    // Arrange
    let store = ctx.store();

    // Act
    let result = resolve_shared_file(&store, "nope").await;

    // Assert
    assert_eq!(
        result.unwrap_err().kind(),
        Some(ErrorKind::ShareResolutionFailed)
    );
}

#[test_context(RemoteStoreContext)]
#[tokio::test]
#[serial]
async fn upload_streams_files_and_tags(ctx: &mut RemoteStoreContext) {
    // Arrange
    let f1 = ctx.root.join("f1.pdf");
    let f2 = ctx.root.join("f2.png");
    for (path, content) in [(&f1, b"pdf data".as_slice()), (&f2, b"png".as_slice())] {
        let mut f = tokio::fs::File::create(path).await.unwrap();
        f.write_all(content).await.unwrap();
        f.flush().await.unwrap();
    }
    let list = ctx.list();

    // Act
    list.upload(&[f1, f2], &["docs".to_string(), "work".to_string()])
        .await
        .unwrap();

    // Assert
    let remote = ctx.remote.lock().unwrap();
    assert_eq!(
        remote.uploads,
        vec![("f1.pdf".to_string(), 8), ("f2.png".to_string(), 3)]
    );
    assert_eq!(remote.upload_tags, vec!["docs,work".to_string()]);
    drop(remote);
    assert_eq!(list.items().len(), 2);
    assert_eq!(
        list.find_by_filename("f2.png").unwrap().tags,
        vec!["docs".to_string(), "work".to_string()]
    );
}

#[test_context(RemoteStoreContext)]
#[tokio::test]
#[serial]
async fn upload_missing_file_fails(ctx: &mut RemoteStoreContext) {
    // Arrange
    let list = ctx.list();
    let missing = ctx.root.join("missing.png");

    // Act
    let result = list.upload(&[missing], &[]).await;

    // Assert
    assert!(matches!(
        result,
        Err(SyncError::Remote {
            kind: ErrorKind::UploadFailed,
            source: TransportError::Io { .. },
        })
    ));
    assert!(ctx.remote.lock().unwrap().uploads.is_empty());
}

#[test_context(RemoteStoreContext)]
#[tokio::test]
#[serial]
async fn login_returns_token(ctx: &mut RemoteStoreContext) {
    // Arrange
    let store = ctx.store();
    let credentials = Credentials {
        email: EMAIL.to_string(),
        password: PASSWORD.to_string(),
    };

    // Act
    let token = store.login(&credentials).await.unwrap();

    // Assert
    assert_eq!(token, TOKEN);
}

#[test_context(RemoteStoreContext)]
#[tokio::test]
#[serial]
async fn login_with_wrong_password_fails(ctx: &mut RemoteStoreContext) {
    // Arrange
    let store = ctx.store();
    let credentials = Credentials {
        email: EMAIL.to_string(),
        password: "wrong".to_string(),
    };

    // Act
    let result = store.login(&credentials).await;

    // Assert
    assert_eq!(result.unwrap_err().kind(), Some(ErrorKind::AuthFailed));
}

#[test_context(RemoteStoreContext)]
#[tokio::test]
#[serial]
async fn register_checks_confirmation_locally(ctx: &mut RemoteStoreContext) {
    // Arrange
    let store = ctx.store();
    let mismatch = Registration {
        email: EMAIL.to_string(),
        password: PASSWORD.to_string(),
        confirm_password: "other".to_string(),
    };
    let matching = Registration {
        confirm_password: PASSWORD.to_string(),
        ..mismatch.clone()
    };

    // Act
    let rejected = store.register(&mismatch).await;
    let accepted = store.register(&matching).await;

    // Assert
    assert!(rejected.is_err());
    assert!(accepted.is_ok());
    assert_eq!(ctx.remote.lock().unwrap().registered, vec![EMAIL.to_string()]);
}

#[test_context(RemoteStoreContext)]
#[tokio::test]
#[serial]
async fn store_trait_lists_directly(ctx: &mut RemoteStoreContext) {
    // Arrange
    ctx.seed(&[("1", "a.png")]);
    let store: Arc<dyn RemoteFileStore> = Arc::new(ctx.store());

    // Act
    let files = store.list_files(TOKEN).await.unwrap();

    // Assert
    assert_eq!(files, vec![FileRecord::new("1", "a.png")]);
}
