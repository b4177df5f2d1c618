//! Move/copy workflows that keep references consistent.
//!
//! Each workflow is the same state machine: perform the raw storage
//! operation, discover the resources that reference the relocated path,
//! then load-rewrite-save each one. Progress is reported to a sink at
//! fixed checkpoints and a cooperative cancel flag is honored between
//! units of work; a single item's failure is recorded on its work item
//! and never aborts the batch.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::resource_id;
use crate::rewrite::{self, UpdateMode};
use crate::store::ResourceStore;

/// Outcome of one reference update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum WorkStatus {
    Pending,
    Success,
    Failure(String),
}

/// One referencing resource scheduled for a rewrite. Items are appended at
/// discovery and updated in place; the full list survives the workflow so
/// callers can render what happened to each resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    pub path: String,
    #[serde(flatten)]
    pub status: WorkStatus,
}

impl WorkItem {
    fn new(path: String) -> Self {
        Self {
            path,
            status: WorkStatus::Pending,
        }
    }
}

/// Result of a workflow run: whether it ran to completion and the final
/// status of every discovered item.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub cancelled: bool,
    pub items: Vec<WorkItem>,
}

impl BatchOutcome {
    fn cancelled_with(items: Vec<WorkItem>) -> Self {
        Self {
            cancelled: true,
            items,
        }
    }

    fn completed_with(items: Vec<WorkItem>) -> Self {
        Self {
            cancelled: false,
            items,
        }
    }

    pub fn completed(&self) -> bool {
        !self.cancelled
    }

    pub fn failures(&self) -> impl Iterator<Item = &WorkItem> {
        self.items
            .iter()
            .filter(|item| matches!(item.status, WorkStatus::Failure(_)))
    }
}

/// Receives `(status, percent)` notifications at workflow checkpoints.
///
/// A sink that wants to stop the workflow requests cancellation on the
/// [`CancelFlag`] passed alongside it; the flag is checked after every
/// notification and between items.
pub trait ProgressSink {
    fn progress(&mut self, status: &str, percent: u8);
}

/// Sink that discards all notifications.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn progress(&mut self, _status: &str, _percent: u8) {}
}

/// Cooperative cancellation flag. An in-flight item always completes before
/// the flag is honored.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Move one document and repoint every resource that references it.
///
/// The raw move runs first; a failure there aborts the workflow. Reference
/// enumeration is then keyed on the old identifier, which no longer exists
/// but is exactly what stale references still contain.
pub fn move_resource_with_references(
    store: &dyn ResourceStore,
    old_id: &str,
    new_id: &str,
    sink: &mut dyn ProgressSink,
    cancel: &CancelFlag,
) -> Result<BatchOutcome> {
    const MOVING: &str = "Moving resource...";
    const SCANNING: &str = "Finding references...";

    if checkpoint(sink, cancel, MOVING, 0) {
        return Ok(BatchOutcome::cancelled_with(Vec::new()));
    }
    store.move_resource(old_id, new_id, true)?;
    if checkpoint(sink, cancel, MOVING, 100) {
        return Ok(BatchOutcome::cancelled_with(Vec::new()));
    }

    if checkpoint(sink, cancel, SCANNING, 0) {
        return Ok(BatchOutcome::cancelled_with(Vec::new()));
    }
    let mut seen = HashSet::new();
    let items: Vec<WorkItem> = store
        .enumerate_references(old_id)?
        .into_iter()
        .filter(|path| seen.insert(path.clone()))
        .map(WorkItem::new)
        .collect();
    if checkpoint(sink, cancel, SCANNING, 100) {
        return Ok(BatchOutcome::cancelled_with(items));
    }

    rewrite_batch(store, items, old_id, new_id, UpdateMode::Exact, sink, cancel)
}

/// Move a folder and repoint every resource referencing anything inside it.
///
/// The listing comes from the folder's new location, but references are
/// still recorded against the old identifiers, so each document's old
/// identifier is reconstructed for the reference query.
pub fn move_folder_with_references(
    store: &dyn ResourceStore,
    old_path: &str,
    new_path: &str,
    sink: &mut dyn ProgressSink,
    cancel: &CancelFlag,
) -> Result<BatchOutcome> {
    let old_path = resource_id::fix_folder_path(old_path)?;
    let new_path = resource_id::fix_folder_path(new_path)?;
    const MOVING: &str = "Moving folder...";
    const SCANNING: &str = "Finding folder references...";

    if checkpoint(sink, cancel, MOVING, 0) {
        return Ok(BatchOutcome::cancelled_with(Vec::new()));
    }
    store.move_folder(&old_path, &new_path, true)?;
    if checkpoint(sink, cancel, MOVING, 100) {
        return Ok(BatchOutcome::cancelled_with(Vec::new()));
    }

    if checkpoint(sink, cancel, SCANNING, 0) {
        return Ok(BatchOutcome::cancelled_with(Vec::new()));
    }
    let listing = store.list_resources(&new_path)?;
    let total = listing.len();
    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for (scanned, entry) in listing.iter().enumerate() {
        if !entry.is_folder {
            let Some(rel) = entry.path.strip_prefix(new_path.as_str()) else {
                continue;
            };
            let old_id = format!("{old_path}{rel}");
            for referencer in store.enumerate_references(&old_id)? {
                if seen.insert(referencer.clone()) {
                    items.push(WorkItem::new(referencer));
                }
            }
        }
        if checkpoint(sink, cancel, SCANNING, scan_percent(scanned + 1, total)) {
            return Ok(BatchOutcome::cancelled_with(items));
        }
    }
    if checkpoint(sink, cancel, SCANNING, 100) {
        return Ok(BatchOutcome::cancelled_with(items));
    }

    rewrite_batch(
        store,
        items,
        &old_path,
        &new_path,
        UpdateMode::Folder,
        sink,
        cancel,
    )
}

/// Copy a folder and repoint the copies at each other.
///
/// References that pointed into the old folder are discovered before the
/// copy and mapped to their counterparts in the new folder; those copies
/// are then rewritten so the copied subtree is self-contained rather than
/// referring back into the original.
pub fn copy_folder_with_references(
    store: &dyn ResourceStore,
    old_path: &str,
    new_path: &str,
    sink: &mut dyn ProgressSink,
    cancel: &CancelFlag,
) -> Result<BatchOutcome> {
    let old_path = resource_id::fix_folder_path(old_path)?;
    let new_path = resource_id::fix_folder_path(new_path)?;
    const COPYING: &str = "Copying folder...";
    const SCANNING: &str = "Finding folder references...";

    // Listed before the copy so the scan does not see the copies themselves.
    let listing = store.list_resources(&old_path)?;

    if checkpoint(sink, cancel, COPYING, 0) {
        return Ok(BatchOutcome::cancelled_with(Vec::new()));
    }
    store.copy_folder(&old_path, &new_path, true)?;
    if checkpoint(sink, cancel, COPYING, 100) {
        return Ok(BatchOutcome::cancelled_with(Vec::new()));
    }

    if checkpoint(sink, cancel, SCANNING, 0) {
        return Ok(BatchOutcome::cancelled_with(Vec::new()));
    }
    let total = listing.len();
    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for (scanned, entry) in listing.iter().enumerate() {
        if !entry.is_folder {
            for referencer in store.enumerate_references(&entry.path)? {
                let Some(rel) = referencer.strip_prefix(old_path.as_str()) else {
                    continue;
                };
                let copy = format!("{new_path}{rel}");
                if seen.insert(copy.clone()) {
                    items.push(WorkItem::new(copy));
                }
            }
        }
        if checkpoint(sink, cancel, SCANNING, scan_percent(scanned + 1, total)) {
            return Ok(BatchOutcome::cancelled_with(items));
        }
    }
    if checkpoint(sink, cancel, SCANNING, 100) {
        return Ok(BatchOutcome::cancelled_with(items));
    }

    rewrite_batch(
        store,
        items,
        &old_path,
        &new_path,
        UpdateMode::Folder,
        sink,
        cancel,
    )
}

/// The shared rewrite loop: load, rewrite, save each item in order.
fn rewrite_batch(
    store: &dyn ResourceStore,
    mut items: Vec<WorkItem>,
    old_prefix: &str,
    new_prefix: &str,
    mode: UpdateMode,
    sink: &mut dyn ProgressSink,
    cancel: &CancelFlag,
) -> Result<BatchOutcome> {
    if items.is_empty() {
        return Ok(BatchOutcome::completed_with(items));
    }

    let total = items.len();
    for index in 0..total {
        items[index].status = WorkStatus::Pending;
        let status_line = format!("Updating references in {}", items[index].path);
        if checkpoint(sink, cancel, &status_line, scan_percent(index, total)) {
            return Ok(BatchOutcome::cancelled_with(items));
        }

        match update_single(store, &items[index].path, old_prefix, new_prefix, mode) {
            Ok(count) => {
                tracing::debug!(path = %items[index].path, rewritten = count, "updated references");
                items[index].status = WorkStatus::Success;
            }
            Err(err) => {
                tracing::warn!(path = %items[index].path, error = %err, "reference update failed, continuing with remaining items");
                items[index].status = WorkStatus::Failure(err.to_string());
            }
        }

        let done = index + 1;
        let percent = if done == total {
            100
        } else {
            scan_percent(done, total)
        };
        if checkpoint(sink, cancel, &status_line, percent) {
            return Ok(BatchOutcome::cancelled_with(items));
        }
    }

    Ok(BatchOutcome::completed_with(items))
}

/// Load one referencing resource, rewrite it and save it back under its own
/// unchanged path.
fn update_single(
    store: &dyn ResourceStore,
    path: &str,
    old_prefix: &str,
    new_prefix: &str,
    mode: UpdateMode,
) -> Result<usize> {
    let mut resource = store.get(path)?;
    let count = rewrite::rewrite(&mut resource, old_prefix, new_prefix, mode);
    store.save(path, &resource)?;
    Ok(count)
}

/// Notify the sink, then observe the cancel flag the sink may just have set.
fn checkpoint(
    sink: &mut dyn ProgressSink,
    cancel: &CancelFlag,
    status: &str,
    percent: u8,
) -> bool {
    sink.progress(status, percent);
    cancel.is_cancelled()
}

fn scan_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let raw = (done as f64 / total as f64 * 100.0).round() as i64;
    raw.clamp(0, 99) as u8
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
