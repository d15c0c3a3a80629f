//! Pure transitions over an ordered list of records.
//!
//! Nothing here touches the network; the synchronizer composes these with
//! remote calls.

use kernel::FileRecord;

/// Moves the record `moved` to the index `target` occupied before the move.
///
/// Returns `None` when the ids are equal or either one is absent. All other
/// records keep their relative order.
#[must_use]
pub fn move_record(items: &[FileRecord], moved: &str, target: &str) -> Option<Vec<FileRecord>> {
    if moved == target {
        return None;
    }
    let from = position_by_id(items, moved)?;
    let to = position_by_id(items, target)?;

    let mut result = items.to_vec();
    let record = result.remove(from);
    result.insert(to, record);
    Some(result)
}

/// Ids in display order, as persisted by the remote store.
#[must_use]
pub fn order_of(items: &[FileRecord]) -> Vec<String> {
    items.iter().map(|r| r.id.clone()).collect()
}

/// Rearranges `items` to follow `order`. Records missing from `order` keep
/// their relative order after the ordered ones; ids in `order` that are no
/// longer present are ignored.
#[must_use]
pub fn arrange(items: Vec<FileRecord>, order: &[String]) -> Vec<FileRecord> {
    let mut remaining: Vec<Option<FileRecord>> = items.into_iter().map(Some).collect();
    let mut result = Vec::with_capacity(remaining.len());
    for id in order {
        let slot = remaining
            .iter_mut()
            .find(|r| r.as_ref().is_some_and(|r| &r.id == id));
        if let Some(record) = slot.and_then(Option::take) {
            result.push(record);
        }
    }
    result.extend(remaining.into_iter().flatten());
    result
}

/// Tag set of `tags` with `tag` added. Existing order is kept and the tag
/// is appended only when missing.
#[must_use]
pub fn with_tag(tags: &[String], tag: &str) -> Vec<String> {
    let mut result = dedup(tags);
    if !result.iter().any(|t| t == tag) {
        result.push(tag.to_string());
    }
    result
}

/// Tag set of `tags` with every occurrence of `tag` removed.
#[must_use]
pub fn without_tag(tags: &[String], tag: &str) -> Vec<String> {
    dedup(tags).into_iter().filter(|t| t != tag).collect()
}

/// Replaces the record with the same filename, keeping its position.
/// Returns `false` when no record matches.
pub fn replace_by_filename(items: &mut [FileRecord], record: FileRecord) -> bool {
    match items.iter_mut().find(|r| r.filename == record.filename) {
        Some(slot) => {
            *slot = record;
            true
        }
        None => false,
    }
}

pub fn remove_by_filename(items: &mut Vec<FileRecord>, filename: &str) {
    items.retain(|r| r.filename != filename);
}

/// Drops records whose id or filename was already seen, keeping the first.
/// Returns the kept records and how many were dropped.
#[must_use]
pub fn distinct(items: Vec<FileRecord>) -> (Vec<FileRecord>, usize) {
    let total = items.len();
    let mut result: Vec<FileRecord> = Vec::with_capacity(total);
    for record in items {
        if !result
            .iter()
            .any(|r| r.id == record.id || r.filename == record.filename)
        {
            result.push(record);
        }
    }
    let dropped = total - result.len();
    (result, dropped)
}

#[must_use]
pub fn position_by_id(items: &[FileRecord], id: &str) -> Option<usize> {
    items.iter().position(|r| r.id == id)
}

fn dedup(tags: &[String]) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(tags.len());
    for t in tags {
        if !result.contains(t) {
            result.push(t.clone());
        }
    }
    result
}
