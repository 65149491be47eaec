use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::debug;

use crate::content_type::{ContentTypePolicy, ExtensionPolicy};
use crate::entry::{listing_order, Entry, EntryKind, SharedEntry};
use crate::error::EntryError;

/// Filesystem-backed entry. Inspected once at construction.
#[derive(Clone)]
pub struct FsEntry {
    path: PathBuf,
    label: String,
    kind: EntryKind,
    is_file: bool,
    policy: Arc<dyn ContentTypePolicy>,
}

impl std::fmt::Debug for FsEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsEntry")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish()
    }
}

impl FsEntry {
    /// Canonicalize `path` and classify it with the default policy.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, EntryError> {
        Self::with_policy(path, Arc::new(ExtensionPolicy::default()))
    }

    pub fn with_policy<P: AsRef<Path>>(
        path: P,
        policy: Arc<dyn ContentTypePolicy>,
    ) -> Result<Self, EntryError> {
        let path = path.as_ref();
        let canonical = fs::canonicalize(path).map_err(|e| EntryError::io(path, e))?;
        let metadata = fs::metadata(&canonical).map_err(|e| EntryError::io(&canonical, e))?;
        Ok(Self::from_parts(canonical, metadata.is_dir(), metadata.is_file(), policy))
    }

    fn from_parts(
        path: PathBuf,
        is_dir: bool,
        is_file: bool,
        policy: Arc<dyn ContentTypePolicy>,
    ) -> Self {
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        let kind = if is_dir {
            EntryKind::Container
        } else if is_file {
            match policy.guess(&path) {
                Some(content_type) => EntryKind::Content { content_type },
                None => EntryKind::Opaque,
            }
        } else {
            EntryKind::Opaque
        };

        Self {
            path,
            label,
            kind,
            is_file,
            policy,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_listing(&self) -> std::io::Result<Vec<FsEntry>> {
        let mut children = Vec::new();
        for dir_entry in fs::read_dir(&self.path)? {
            let Ok(dir_entry) = dir_entry else {
                continue;
            };
            let child_path = dir_entry.path();
            // Follow symlinks so a link to a directory lists as a container.
            let (is_dir, is_file) = match fs::metadata(&child_path) {
                Ok(meta) => (meta.is_dir(), meta.is_file()),
                Err(_) => (false, false),
            };
            children.push(Self::from_parts(
                child_path,
                is_dir,
                is_file,
                self.policy.clone(),
            ));
        }
        Ok(children)
    }
}

impl Entry for FsEntry {
    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> &EntryKind {
        &self.kind
    }

    fn list_children(&self) -> Vec<SharedEntry> {
        if !self.kind.is_container() {
            return Vec::new();
        }

        let mut children: Vec<SharedEntry> = match self.read_listing() {
            Ok(children) => children
                .into_iter()
                .map(|child| Arc::new(child) as SharedEntry)
                .collect(),
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "listing failed, treating as empty");
                return Vec::new();
            }
        };

        children.sort_by(|a, b| listing_order(a.as_ref(), b.as_ref()));
        children
    }

    fn open_content(&self) -> Result<Box<dyn Read + Send>, EntryError> {
        if self.kind.content_type().is_none() {
            return Err(EntryError::unsupported(&self.label));
        }
        let file = File::open(&self.path).map_err(|e| EntryError::io(&self.path, e))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn is_openable(&self) -> bool {
        self.is_file
    }

    fn open_externally(&self) -> Result<(), EntryError> {
        if !self.is_file {
            return Err(EntryError::unsupported(&self.label));
        }

        let mut command = opener_command(&self.path);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command.spawn().map_err(|e| EntryError::Launch {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        debug!(path = %self.path.display(), "opened externally");
        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn opener_command(path: &Path) -> Command {
    let mut command = Command::new("open");
    command.arg(path);
    command
}

#[cfg(target_os = "windows")]
fn opener_command(path: &Path) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", ""]).arg(path);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener_command(path: &Path) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(path);
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn labels(entries: &[SharedEntry]) -> Vec<String> {
        entries.iter().map(|e| e.label().to_string()).collect()
    }

    #[test]
    fn test_listing_sorts_directories_first() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("dirB")).unwrap();
        fs::write(dir.path().join("fileA"), "a").unwrap();
        fs::create_dir(dir.path().join("dirA")).unwrap();
        fs::write(dir.path().join("fileB"), "b").unwrap();

        let root = FsEntry::new(dir.path()).unwrap();
        assert!(root.is_container());
        assert_eq!(labels(&root.list_children()), ["dirA", "dirB", "fileA", "fileB"]);
    }

    #[test]
    fn test_text_file_is_content_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test-text-file.txt");
        fs::write(&path, "Test Text Content").unwrap();

        let entry = FsEntry::new(&path).unwrap();
        assert_eq!(entry.label(), "test-text-file.txt");
        assert_eq!(entry.content_type(), Some("text/plain"));
        assert!(entry.is_openable());

        let mut text = String::new();
        entry.open_content().unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "Test Text Content");
    }

    #[test]
    fn test_png_file_gets_image_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test-image.png");
        fs::write(&path, b"\x89PNG\r\n\x1a\n").unwrap();

        let entry = FsEntry::new(&path).unwrap();
        assert_eq!(entry.content_type(), Some("image/png"));
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FsEntry::new(dir.path().join("does-not-exist"));
        assert!(matches!(result, Err(EntryError::Io { .. })));
    }

    #[test]
    fn test_leaf_lists_nothing_and_directory_has_no_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, "# notes").unwrap();

        let leaf = FsEntry::new(&path).unwrap();
        assert!(leaf.list_children().is_empty());

        let root = FsEntry::new(dir.path()).unwrap();
        assert!(matches!(root.open_content(), Err(EntryError::Unsupported { .. })));
        assert!(!root.is_openable());
    }

    #[test]
    fn test_label_uses_canonical_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("inner")).unwrap();
        let dotted = dir.path().join("inner").join("..").join("inner");

        let entry = FsEntry::new(dotted).unwrap();
        assert_eq!(entry.label(), "inner");
    }
}
