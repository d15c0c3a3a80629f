#![warn(clippy::unwrap_in_result)]
#![warn(clippy::unwrap_used)]

use comfy_table::{presets::UTF8_HORIZONTAL_ONLY, Attribute, Cell, ContentArrangement, Table};
use kernel::FileRecord;

pub mod config;
pub mod error;
pub mod order;
pub mod resource;
pub mod store;
pub mod sync;

pub use error::{ErrorKind, SyncError};
pub use store::{HttpFileStore, RemoteFileStore};
pub use sync::{FileList, LinkRefresh, OrderFailurePolicy, OrderSync, SyncOptions};

/// Resolves a public share id to the shared file's content URL. Needs no
/// credentials.
pub async fn resolve_shared_file(
    store: &dyn RemoteFileStore,
    shared_id: &str,
) -> error::Result<String> {
    store.resolve_shared(shared_id).await.map_err(|e| {
        tracing::error!("cannot resolve shared file {shared_id}: {e}");
        SyncError::remote(ErrorKind::ShareResolutionFailed, e)
    })
}

/// Renders records in display order.
#[must_use]
pub fn files_table(files: &[FileRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120)
        .set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Id").add_attribute(Attribute::Bold),
            Cell::new("File").add_attribute(Attribute::Bold),
            Cell::new("Views").add_attribute(Attribute::Bold),
            Cell::new("Tags").add_attribute(Attribute::Bold),
            Cell::new("Link").add_attribute(Attribute::Bold),
        ]);

    for (position, f) in files.iter().enumerate() {
        table.add_row(vec![
            Cell::new(position + 1),
            Cell::new(&f.id),
            Cell::new(&f.filename),
            Cell::new(f.views),
            Cell::new(f.tags.join(", ")),
            Cell::new(f.shared_link.as_deref().unwrap_or("-")),
        ]);
    }
    table
}
