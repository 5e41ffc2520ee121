use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use super::reader::compute_checksum;
use super::types::*;

/// Raw notification forwarded from the OS watcher
pub type WatchMessage = notify::Result<Event>;

/// Watches a single workbook for content changes.
///
/// The parent directory is registered rather than the file itself so saves
/// that replace the file (write to temp, rename over) are still observed.
pub struct SheetWatcher {
    #[allow(dead_code)]
    watcher: RecommendedWatcher,
    filter: ChangeFilter,
}

impl SheetWatcher {
    /// Start watching `path`; notifications arrive on the returned receiver.
    ///
    /// `synced_checksum` is the checksum of the content last synchronized, if any.
    pub fn watch(
        path: &Path,
        synced_checksum: Option<String>,
    ) -> Result<(Self, UnboundedReceiver<WatchMessage>), ExcelError> {
        let path = path
            .canonicalize()
            .map_err(|_| ExcelError::file_not_found(&path.display().to_string()))?;
        let parent = path
            .parent()
            .ok_or_else(|| ExcelError::watch_error(format!("No parent directory for {}", path.display())))?
            .to_path_buf();

        let (tx, rx) = unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )
        .map_err(|e| ExcelError::watch_error(format!("Failed to create watcher: {}", e)))?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .map_err(|e| ExcelError::watch_error(format!("Failed to watch {}: {}", parent.display(), e)))?;

        let filter = ChangeFilter::new(path, synced_checksum);

        Ok((SheetWatcher { watcher, filter }, rx))
    }

    pub fn path(&self) -> &Path {
        self.filter.path()
    }

    pub fn filter_mut(&mut self) -> &mut ChangeFilter {
        &mut self.filter
    }
}

/// Decides which notifications amount to a new version of the workbook
#[derive(Debug)]
pub struct ChangeFilter {
    path: PathBuf,
    last_checksum: Option<String>,
}

impl ChangeFilter {
    /// Filter for `path`; `last_checksum` is the content already synchronized
    pub fn new(path: PathBuf, last_checksum: Option<String>) -> Self {
        ChangeFilter { path, last_checksum }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Forget the last seen content so the next change event always passes
    pub fn forget_checksum(&mut self) {
        self.last_checksum = None;
    }

    /// Turn a raw notification into a change of the watched file, if it is one
    pub fn process_event(&mut self, event: &Event) -> Option<FileChangeEvent> {
        if !event.paths.iter().any(|p| p == &self.path) {
            log::debug!("Ignoring file: [{:?}] {:?}", event.kind, event.paths);
            return None;
        }

        let Some(change_type) = change_type(&event.kind) else {
            log::debug!("Ignoring event: [{:?}] {}", event.kind, self.path.display());
            return None;
        };

        log::debug!("event: {:?}", event);

        let new_checksum = match compute_checksum(&self.path) {
            Ok(checksum) => checksum,
            Err(e) => {
                log::debug!("Skipping unreadable {}: {}", self.path.display(), e);
                return None;
            }
        };

        if self.last_checksum.as_deref() == Some(new_checksum.as_str()) {
            log::debug!("Content of {} unchanged, skipping", self.path.display());
            return None;
        }
        self.last_checksum = Some(new_checksum.clone());

        Some(FileChangeEvent {
            path: self.path.clone(),
            change_type,
            new_checksum,
        })
    }
}

/// Event kinds that can carry new file content
fn change_type(kind: &EventKind) -> Option<FileChangeType> {
    match kind {
        EventKind::Create(_) => Some(FileChangeType::Created),
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            Some(FileChangeType::Modified)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both | RenameMode::Any)) => {
            Some(FileChangeType::Renamed)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    fn event(kind: EventKind, path: &Path) -> Event {
        Event::new(kind).add_path(path.to_path_buf())
    }

    fn setup() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().canonicalize().unwrap().join("book.xlsx");
        std::fs::write(&path, b"v1").unwrap();
        (dir, path)
    }

    #[test]
    fn test_change_type_predicate() {
        assert_eq!(change_type(&EventKind::Create(CreateKind::File)), Some(FileChangeType::Created));
        assert_eq!(
            change_type(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(FileChangeType::Modified)
        );
        assert_eq!(
            change_type(&EventKind::Modify(ModifyKind::Name(RenameMode::To))),
            Some(FileChangeType::Renamed)
        );
        assert_eq!(change_type(&EventKind::Modify(ModifyKind::Name(RenameMode::From))), None);
        assert_eq!(change_type(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any))), None);
        assert_eq!(change_type(&EventKind::Remove(RemoveKind::File)), None);
        assert_eq!(change_type(&EventKind::Access(AccessKind::Any)), None);
    }

    #[test]
    fn test_other_paths_are_ignored() {
        let (dir, path) = setup();
        let mut filter = ChangeFilter::new(path, None);

        let other = dir.path().join("notes.txt");
        std::fs::write(&other, b"x").unwrap();

        assert!(filter
            .process_event(&event(EventKind::Create(CreateKind::File), &other))
            .is_none());
    }

    #[test]
    fn test_unchanged_content_is_suppressed() {
        let (_dir, path) = setup();
        let mut filter = ChangeFilter::new(path.clone(), compute_checksum(&path).ok());
        let create = event(EventKind::Create(CreateKind::File), &path);

        assert!(filter.process_event(&create).is_none());

        std::fs::write(&path, b"v2").unwrap();
        let change = filter.process_event(&create).unwrap();
        assert_eq!(change.path, path);
        assert_eq!(change.change_type, FileChangeType::Created);

        assert!(filter.process_event(&create).is_none());

        filter.forget_checksum();
        assert!(filter.process_event(&create).is_some());
    }

    #[test]
    fn test_removed_file_is_skipped() {
        let (_dir, path) = setup();
        let mut filter = ChangeFilter::new(path.clone(), None);
        std::fs::remove_file(&path).unwrap();

        assert!(filter
            .process_event(&event(EventKind::Modify(ModifyKind::Any), &path))
            .is_none());
    }

    #[test]
    fn test_watch_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SheetWatcher::watch(&dir.path().join("missing.xlsx"), None).err().unwrap();
        assert_eq!(err.error_type, ExcelErrorType::FileNotFound);
    }

    #[test]
    fn test_watch_resolves_absolute_path() {
        let (_dir, path) = setup();
        let (watcher, _rx) = SheetWatcher::watch(&path, None).unwrap();
        assert_eq!(watcher.path(), path.as_path());
    }
}
