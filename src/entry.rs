use std::fmt;
use std::io::Read;
use std::sync::Arc;

use crate::error::EntryError;

/// Shared handle to an entry. View nodes and background jobs both hold one.
pub type SharedEntry = Arc<dyn Entry>;

/// Declared capability of an entry. The tree and preview dispatch on this
/// instead of probing the concrete type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// Can list children (a directory).
    Container,
    /// Leaf exposing a content type and a byte stream.
    Content { content_type: String },
    /// Leaf with no content operations.
    Opaque,
}

impl EntryKind {
    pub fn is_container(&self) -> bool {
        matches!(self, EntryKind::Container)
    }

    pub fn content_type(&self) -> Option<&str> {
        match self {
            EntryKind::Content { content_type } => Some(content_type),
            _ => None,
        }
    }
}

/// A filesystem-like item exposed through a label and a capability set.
pub trait Entry: Send + Sync + fmt::Debug {
    fn label(&self) -> &str;

    fn kind(&self) -> &EntryKind;

    fn is_container(&self) -> bool {
        self.kind().is_container()
    }

    fn content_type(&self) -> Option<&str> {
        self.kind().content_type()
    }

    /// Immediate children, directories first and then by name.
    ///
    /// Never fails: a listing that cannot be read is reported as empty.
    fn list_children(&self) -> Vec<SharedEntry> {
        Vec::new()
    }

    /// Open the content stream of a `Content` leaf.
    fn open_content(&self) -> Result<Box<dyn Read + Send>, EntryError> {
        Err(EntryError::unsupported(self.label()))
    }

    fn is_openable(&self) -> bool {
        false
    }

    /// Hand the entry to the platform's default application.
    fn open_externally(&self) -> Result<(), EntryError> {
        Err(EntryError::unsupported(self.label()))
    }
}

/// Sort key used by every container listing: containers before leaves,
/// then by name.
pub fn listing_order(a: &dyn Entry, b: &dyn Entry) -> std::cmp::Ordering {
    (!a.is_container())
        .cmp(&!b.is_container())
        .then_with(|| a.label().cmp(b.label()))
}
