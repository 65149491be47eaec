//! Lazy file-tree view model: a directory tree whose children are listed on
//! demand, flattened into the rows a virtualized list renders, with keyboard
//! navigation and a content preview fed by background workers.

pub mod config;
pub mod content_type;
pub mod entry;
pub mod error;
pub mod fs_entry;
pub mod loader;
pub mod logging;
pub mod navigation;
pub mod navigator;
pub mod preview;
pub mod tree;

pub use entry::{Entry, EntryKind, SharedEntry};
pub use fs_entry::FsEntry;
pub use navigator::{NavEvent, Navigator, RootState};
pub use tree::{ViewNode, ViewTree};
