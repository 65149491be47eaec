use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use indextree::NodeId;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::content_type::{ContentTypePolicy, ExtensionPolicy};
use crate::entry::SharedEntry;
use crate::fs_entry::FsEntry;
use crate::loader::{JobKind, LoadResult, Loader, Ticket};
use crate::navigation::{navigate, scroll_to_reveal, NavKey, Viewport};
use crate::preview::{Preview, PreviewKind};
use crate::tree::ViewTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootState {
    Valid,
    /// The root path does not resolve; the tree pane shows a prompt instead.
    Invalid,
}

/// Notifications for the rendering layer, drained after each mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    RootChanged,
    /// Expand state or loaded children changed; the visible list was rebuilt.
    TreeChanged,
    SelectionChanged(Option<NodeId>),
    /// New first row of the viewport.
    ScrollTo(usize),
    PreviewChanged,
}

/// Owns the view tree, selection and preview, and applies background
/// results on the caller's thread.
pub struct Navigator {
    config: Config,
    policy: Arc<dyn ContentTypePolicy>,
    root_input: String,
    tree: Option<ViewTree>,
    generation: u64,
    selected: Option<NodeId>,
    visible: Vec<NodeId>,
    pending_loads: HashSet<NodeId>,
    preview: Preview,
    preview_ticket: Option<Ticket>,
    viewport: Viewport,
    loader: Loader,
    events: Vec<NavEvent>,
    status: Option<String>,
}

impl Navigator {
    pub fn new(config: Config) -> Self {
        let policy = Arc::new(ExtensionPolicy {
            sniff_unknown: config.sniff_unknown_types,
        });
        Self::with_policy(config, policy)
    }

    pub fn with_policy(config: Config, policy: Arc<dyn ContentTypePolicy>) -> Self {
        let loader = Loader::new(config.worker_threads);
        Self {
            config,
            policy,
            root_input: String::new(),
            tree: None,
            generation: 0,
            selected: None,
            visible: Vec::new(),
            pending_loads: HashSet::new(),
            preview: Preview::Placeholder,
            preview_ticket: None,
            viewport: Viewport::default(),
            loader,
            events: Vec::new(),
            status: None,
        }
    }

    // --- Read access ---

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root_input(&self) -> &str {
        &self.root_input
    }

    pub fn root_state(&self) -> RootState {
        if self.tree.is_some() {
            RootState::Valid
        } else {
            RootState::Invalid
        }
    }

    pub fn tree(&self) -> Option<&ViewTree> {
        self.tree.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn visible(&self) -> &[NodeId] {
        &self.visible
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn selected_index(&self) -> Option<usize> {
        let selected = self.selected?;
        self.visible.iter().position(|&id| id == selected)
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scroll_offset(&self) -> usize {
        self.viewport.first_row
    }

    pub fn is_loading(&self, id: NodeId) -> bool {
        self.pending_loads.contains(&id)
    }

    /// Last user-facing message (e.g. a failed external open).
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn drain_events(&mut self) -> Vec<NavEvent> {
        std::mem::take(&mut self.events)
    }

    // --- Root ---

    /// Re-derive the tree from a path typed by the user.
    pub fn set_root_path(&mut self, text: &str) -> RootState {
        self.root_input = text.to_string();
        let entry = if text.trim().is_empty() {
            None
        } else {
            match FsEntry::with_policy(text.trim(), self.policy.clone()) {
                Ok(entry) => Some(Arc::new(entry) as SharedEntry),
                Err(err) => {
                    debug!(path = text, error = %err, "root path rejected");
                    None
                }
            }
        };
        self.set_root_entry(entry);
        self.root_state()
    }

    /// Replace the whole tree. Results still in flight for the old tree are
    /// discarded when they arrive.
    pub fn set_root_entry(&mut self, entry: Option<SharedEntry>) {
        self.generation += 1;
        self.pending_loads.clear();
        self.tree = entry.map(ViewTree::new);
        if let Some(tree) = &self.tree {
            if let Some(root) = tree.entry(tree.root()) {
                info!(root = root.label(), generation = self.generation, "root changed");
            }
        }
        self.viewport.first_row = 0;
        self.refresh_visible();
        self.events.push(NavEvent::RootChanged);

        let root = self.tree.as_ref().map(ViewTree::root);
        self.select(root);
    }

    // --- Loading ---

    /// Render-time trigger: schedule background listings for the given rows'
    /// nodes that were never loaded.
    pub fn ensure_loaded(&mut self, ids: &[NodeId]) {
        let Some(tree) = &self.tree else {
            return;
        };
        for &id in ids {
            if !tree.needs_load(id) || self.pending_loads.contains(&id) {
                continue;
            }
            let Some(entry) = tree.entry(id).cloned() else {
                continue;
            };
            self.pending_loads.insert(id);
            self.loader.request_children(self.ticket(id), entry);
        }
    }

    /// Schedule loads for every row inside the viewport.
    pub fn ensure_viewport_loaded(&mut self) {
        let end = (self.viewport.first_row + self.viewport.rows.max(1)).min(self.visible.len());
        let start = self.viewport.first_row.min(end);
        let rows = self.visible[start..end].to_vec();
        self.ensure_loaded(&rows);
    }

    /// Apply every finished background result. Returns `true` if anything
    /// visible changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        for result in self.loader.drain() {
            changed |= self.apply(result);
        }
        changed
    }

    /// Wait up to `timeout` for one result and apply it.
    pub fn pump_wait(&mut self, timeout: Duration) -> bool {
        match self.loader.recv_timeout(timeout) {
            Some(result) => self.apply(result),
            None => false,
        }
    }

    /// Nothing scheduled is still outstanding.
    pub fn is_idle(&self) -> bool {
        self.pending_loads.is_empty() && self.preview_ticket.is_none()
    }

    fn apply(&mut self, result: LoadResult) -> bool {
        let ticket = result.ticket();
        if ticket.generation != self.generation {
            debug!(generation = ticket.generation, "discarding result for replaced root");
            return false;
        }

        match result {
            LoadResult::Children { ticket, entries } => self.commit_children(ticket.node, entries),
            LoadResult::Failed {
                ticket,
                job: JobKind::Children,
                reason,
            } => {
                warn!(reason = %reason, "listing job failed");
                self.commit_children(ticket.node, Vec::new())
            }
            LoadResult::Preview { ticket, preview } => self.commit_preview(ticket, preview),
            LoadResult::Failed {
                ticket,
                job: JobKind::Preview,
                reason,
            } => {
                warn!(reason = %reason, "preview job failed");
                self.commit_preview(ticket, Preview::Failed)
            }
        }
    }

    fn commit_children(&mut self, id: NodeId, entries: Vec<SharedEntry>) -> bool {
        self.pending_loads.remove(&id);
        let Some(tree) = self.tree.as_mut() else {
            return false;
        };
        if !tree.commit_children(id, entries) {
            debug!("duplicate listing dropped");
            return false;
        }
        self.refresh_visible();
        self.events.push(NavEvent::TreeChanged);
        true
    }

    fn commit_preview(&mut self, ticket: Ticket, preview: Preview) -> bool {
        if self.preview_ticket != Some(ticket) {
            debug!("discarding stale preview");
            return false;
        }
        self.preview_ticket = None;
        self.preview = preview;
        self.events.push(NavEvent::PreviewChanged);
        true
    }

    fn ticket(&self, node: NodeId) -> Ticket {
        Ticket {
            generation: self.generation,
            node,
        }
    }

    // --- Selection and gestures ---

    pub fn handle_key(&mut self, key: NavKey) {
        let Some(tree) = self.tree.as_mut() else {
            return;
        };
        let outcome = navigate(tree, &self.visible, self.selected, key, self.config.navigation);
        if outcome.tree_changed {
            self.refresh_visible();
            self.events.push(NavEvent::TreeChanged);
        }
        if outcome.selected != self.selected {
            self.select(outcome.selected);
        }
    }

    /// Single click on a row.
    pub fn click(&mut self, row: usize) {
        if let Some(&id) = self.visible.get(row) {
            if self.selected != Some(id) {
                self.select(Some(id));
            }
        }
    }

    /// Double click: toggle a container, or open a file externally when
    /// configured to.
    pub fn double_click(&mut self, row: usize) {
        let Some(&id) = self.visible.get(row) else {
            return;
        };
        self.click(row);

        let Some(entry) = self.tree.as_ref().and_then(|t| t.entry(id)).cloned() else {
            return;
        };
        if entry.is_container() {
            self.toggle(id);
        } else if self.config.double_click_opens && entry.is_openable() {
            self.status = Some(match entry.open_externally() {
                Ok(()) => format!("Opened {}", entry.label()),
                Err(err) => {
                    warn!(error = %err, "external open failed");
                    err.to_string()
                }
            });
        }
    }

    /// Click on the expand/collapse chevron. Only rows with loaded
    /// children show one.
    pub fn toggle_row(&mut self, row: usize) {
        let Some(&id) = self.visible.get(row) else {
            return;
        };
        if self.tree.as_ref().is_some_and(|t| t.has_children(id)) {
            self.toggle(id);
        }
    }

    fn toggle(&mut self, id: NodeId) {
        if let Some(tree) = self.tree.as_mut() {
            if tree.toggle_expanded(id) {
                self.refresh_visible();
                self.events.push(NavEvent::TreeChanged);
            }
        }
    }

    pub fn select(&mut self, id: Option<NodeId>) {
        self.selected = id;
        self.events.push(NavEvent::SelectionChanged(id));
        self.scroll_to_selection();
        self.request_preview();
    }

    fn request_preview(&mut self) {
        let entry = self
            .selected
            .and_then(|id| self.tree.as_ref()?.entry(id).cloned());
        let kind = PreviewKind::classify(entry.as_deref());

        self.preview = Preview::initial(kind);
        self.preview_ticket = None;
        if let (Some(entry), Some(id)) = (entry, self.selected) {
            if kind.needs_read() {
                let ticket = self.ticket(id);
                self.preview_ticket = Some(ticket);
                self.loader
                    .request_preview(ticket, entry, kind, self.config.max_preview_bytes);
            }
        }
        self.events.push(NavEvent::PreviewChanged);
    }

    // --- Viewport ---

    pub fn set_viewport_rows(&mut self, rows: usize) {
        if self.viewport.rows != rows {
            self.viewport.rows = rows;
            self.clamp_viewport();
        }
    }

    /// Scroll by whole rows (mouse wheel).
    pub fn scroll_by(&mut self, delta: isize) {
        let first = self.viewport.first_row.saturating_add_signed(delta);
        self.set_first_row(first);
    }

    fn scroll_to_selection(&mut self) {
        let Some(index) = self.selected_index() else {
            return;
        };
        let first = scroll_to_reveal(
            index,
            self.viewport,
            self.config.scroll_margin,
            self.visible.len(),
        );
        self.set_first_row(first);
    }

    fn set_first_row(&mut self, first: usize) {
        let max_first = self.visible.len().saturating_sub(self.viewport.rows);
        let first = first.min(max_first);
        if first != self.viewport.first_row {
            self.viewport.first_row = first;
            self.events.push(NavEvent::ScrollTo(first));
        }
    }

    fn clamp_viewport(&mut self) {
        self.set_first_row(self.viewport.first_row);
    }

    fn refresh_visible(&mut self) {
        self.visible = self
            .tree
            .as_ref()
            .map(ViewTree::visible_depth_first)
            .unwrap_or_default();
        self.clamp_viewport();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::testing::MemEntry;
    use crate::entry::Entry;
    use crate::preview::{NO_PREVIEW, READ_FAILED};
    use std::time::Instant;

    const WAIT: Duration = Duration::from_secs(5);

    fn settle(nav: &mut Navigator) {
        let deadline = Instant::now() + WAIT;
        while !nav.is_idle() && Instant::now() < deadline {
            nav.pump_wait(Duration::from_millis(50));
        }
        assert!(nav.is_idle(), "background work did not finish");
    }

    fn labels(nav: &Navigator) -> Vec<String> {
        let tree = nav.tree().unwrap();
        nav.visible()
            .iter()
            .map(|&id| tree.entry(id).unwrap().label().to_string())
            .collect()
    }

    fn sample_root() -> SharedEntry {
        MemEntry::dir(
            "root",
            vec![
                MemEntry::dir("docs", vec![MemEntry::content("readme.txt", "text/plain", b"hello")]),
                MemEntry::content("notes.txt", "text/plain", b"Test Text Content"),
                MemEntry::unreadable("locked.txt", "text/plain"),
                MemEntry::content("clip.mp4", "video/mp4", b""),
            ],
        )
    }

    fn loaded_navigator() -> Navigator {
        let mut nav = Navigator::new(Config::default());
        nav.set_root_entry(Some(sample_root()));
        let visible = nav.visible().to_vec();
        nav.ensure_loaded(&visible);
        settle(&mut nav);
        let visible = nav.visible().to_vec();
        nav.ensure_loaded(&visible);
        settle(&mut nav);
        nav.drain_events();
        nav
    }

    #[test]
    fn test_root_selected_and_listed_lazily() {
        let mut nav = Navigator::new(Config::default());
        nav.set_root_entry(Some(sample_root()));

        assert_eq!(nav.root_state(), RootState::Valid);
        assert_eq!(nav.visible().len(), 1);
        assert_eq!(nav.selected(), Some(nav.tree().unwrap().root()));
        assert_eq!(nav.preview(), &Preview::Unsupported);

        let root = nav.tree().unwrap().root();
        nav.ensure_loaded(&[root]);
        assert!(nav.is_loading(root));
        settle(&mut nav);

        assert_eq!(labels(&nav), ["root", "docs", "notes.txt", "locked.txt", "clip.mp4"]);
        assert!(nav.drain_events().contains(&NavEvent::TreeChanged));
    }

    #[test]
    fn test_ensure_loaded_schedules_once() {
        let root = MemEntry::dir_counted("root", vec![MemEntry::file("a")]);
        let mut nav = Navigator::new(Config::default());
        nav.set_root_entry(Some(root.clone()));

        let id = nav.tree().unwrap().root();
        nav.ensure_loaded(&[id]);
        nav.ensure_loaded(&[id]);
        settle(&mut nav);
        nav.ensure_loaded(&[id]);
        settle(&mut nav);

        assert_eq!(root.list_calls(), 1);
    }

    #[test]
    fn test_keyboard_navigation_expands_and_collapses() {
        let mut nav = loaded_navigator();
        nav.handle_key(NavKey::Down);
        let docs = nav.selected().unwrap();
        assert_eq!(nav.tree().unwrap().entry(docs).unwrap().label(), "docs");

        nav.handle_key(NavKey::Right);
        assert!(nav.tree().unwrap().is_expanded(docs));
        assert_eq!(labels(&nav)[2], "readme.txt");
        assert_eq!(nav.selected_index(), Some(2));

        nav.handle_key(NavKey::Left);
        assert_eq!(nav.selected(), Some(docs));
        assert!(!nav.tree().unwrap().is_expanded(docs));
        assert_eq!(nav.visible().len(), 5);

        nav.handle_key(NavKey::Escape);
        assert_eq!(nav.selected(), None);
        assert_eq!(nav.preview().message(), Some("Select a file to see a preview"));
    }

    #[test]
    fn test_preview_reads_text_and_reports_failures() {
        let mut nav = loaded_navigator();

        nav.click(2);
        assert_eq!(nav.preview(), &Preview::Loading);
        settle(&mut nav);
        assert_eq!(
            nav.preview(),
            &Preview::Text {
                text: "Test Text Content".to_string(),
                truncated: false
            }
        );

        nav.click(3);
        settle(&mut nav);
        assert_eq!(nav.preview().message(), Some(READ_FAILED));

        nav.click(4);
        assert_eq!(nav.preview().message(), Some(NO_PREVIEW));
        assert!(nav.is_idle());
    }

    #[test]
    fn test_stale_preview_is_discarded() {
        let mut nav = loaded_navigator();
        nav.click(2);
        nav.click(4);
        settle(&mut nav);
        // Let the abandoned read arrive too.
        nav.pump_wait(Duration::from_millis(200));
        assert_eq!(nav.preview(), &Preview::Unsupported);
    }

    #[test]
    fn test_results_for_replaced_root_are_dropped() {
        let mut nav = Navigator::new(Config::default());
        nav.set_root_entry(Some(sample_root()));
        let old_root = nav.tree().unwrap().root();
        nav.ensure_loaded(&[old_root]);

        nav.set_root_entry(Some(MemEntry::dir("other", vec![])));
        assert!(nav.is_idle());
        nav.pump_wait(WAIT);
        nav.pump();

        assert_eq!(labels(&nav), ["other"]);
        assert_eq!(nav.tree().unwrap().len(), 1);
    }

    #[test]
    fn test_double_click_toggles_container() {
        let mut nav = loaded_navigator();
        nav.double_click(1);
        assert_eq!(labels(&nav)[2], "readme.txt");

        nav.double_click(1);
        assert_eq!(nav.visible().len(), 5);

        // Collapsing the root hides everything below it.
        nav.double_click(0);
        assert_eq!(nav.visible().len(), 1);
    }

    #[test]
    fn test_chevron_requires_loaded_children() {
        let mut nav = Navigator::new(Config::default());
        nav.set_root_entry(Some(MemEntry::dir("root", vec![MemEntry::file("a")])));
        let root = nav.tree().unwrap().root();

        nav.toggle_row(0);
        assert!(nav.tree().unwrap().is_expanded(root));

        nav.ensure_loaded(&[root]);
        settle(&mut nav);
        nav.toggle_row(0);
        assert!(!nav.tree().unwrap().is_expanded(root));
    }

    #[test]
    fn test_selection_scrolls_with_margin() {
        let children = (0..30).map(|i| MemEntry::file(&format!("f{i:02}"))).collect();
        let mut nav = Navigator::new(Config::default());
        nav.set_root_entry(Some(MemEntry::dir("root", children)));
        nav.set_viewport_rows(10);
        let root = nav.tree().unwrap().root();
        nav.ensure_loaded(&[root]);
        settle(&mut nav);
        nav.drain_events();

        for _ in 0..8 {
            nav.handle_key(NavKey::Down);
        }
        assert_eq!(nav.selected_index(), Some(8));
        assert_eq!(nav.scroll_offset(), 2);
        assert!(nav.drain_events().contains(&NavEvent::ScrollTo(2)));

        nav.scroll_by(100);
        assert_eq!(nav.scroll_offset(), 21);
    }

    #[test]
    fn test_invalid_path_gives_no_tree() {
        let dir = tempfile::tempdir().unwrap();
        let mut nav = Navigator::new(Config::default());

        let missing = dir.path().join("nope");
        assert_eq!(nav.set_root_path(missing.to_str().unwrap()), RootState::Invalid);
        assert!(nav.tree().is_none());
        assert!(nav.visible().is_empty());
        nav.handle_key(NavKey::Down);

        assert_eq!(nav.set_root_path(""), RootState::Invalid);
        assert_eq!(nav.set_root_path(dir.path().to_str().unwrap()), RootState::Valid);
        assert_eq!(nav.root_input(), dir.path().to_str().unwrap());
    }

    #[test]
    fn test_filesystem_root_lists_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("dirB")).unwrap();
        std::fs::write(dir.path().join("fileA"), "a").unwrap();
        std::fs::create_dir(dir.path().join("dirA")).unwrap();
        std::fs::write(dir.path().join("fileB"), "b").unwrap();

        let mut nav = Navigator::new(Config::default());
        nav.set_root_path(dir.path().to_str().unwrap());
        let root = nav.tree().unwrap().root();
        nav.ensure_loaded(&[root]);
        settle(&mut nav);

        assert_eq!(&labels(&nav)[1..], ["dirA", "dirB", "fileA", "fileB"]);
    }
}
