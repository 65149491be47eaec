use indextree::{Arena, NodeId};

use crate::entry::SharedEntry;

/// View-model state for one entry in the tree.
///
/// Parent and child links live in the arena; the node only keeps the state
/// the arena does not know about.
#[derive(Debug, Clone)]
pub struct ViewNode {
    pub entry: SharedEntry,
    /// Depth from the root (root = 0). Fixed at construction.
    pub level: usize,
    /// Expand flag, independent of whether children are loaded.
    pub expanded: bool,
    /// `false` means children are not fetched yet; leaves start `true`.
    pub loaded: bool,
}

impl ViewNode {
    fn new(entry: SharedEntry, level: usize) -> Self {
        let is_container = entry.is_container();
        Self {
            expanded: is_container && level == 0,
            loaded: !is_container,
            entry,
            level,
        }
    }
}

/// Lazily populated view tree backed by an arena allocator.
pub struct ViewTree {
    arena: Arena<ViewNode>,
    root: NodeId,
}

impl ViewTree {
    /// Create a tree holding only the root. Nothing is listed yet.
    pub fn new(root_entry: SharedEntry) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(ViewNode::new(root_entry, 0));
        Self { arena, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of materialized nodes.
    pub fn len(&self) -> usize {
        self.arena.count()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&ViewNode> {
        self.arena.get(id).map(|n| n.get())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut ViewNode> {
        self.arena.get_mut(id).map(|n| n.get_mut())
    }

    pub fn entry(&self, id: NodeId) -> Option<&SharedEntry> {
        self.get(id).map(|n| &n.entry)
    }

    pub fn level(&self, id: NodeId) -> Option<usize> {
        self.get(id).map(|n| n.level)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id)?.parent()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        if self.arena.get(id).is_none() {
            return Vec::new();
        }
        id.children(&self.arena).collect()
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.get(id).map(|n| n.expanded).unwrap_or(false)
    }

    pub fn is_loaded(&self, id: NodeId) -> bool {
        self.get(id).map(|n| n.loaded).unwrap_or(false)
    }

    /// True for a container whose children were never fetched.
    pub fn needs_load(&self, id: NodeId) -> bool {
        self.get(id)
            .map(|n| !n.loaded && n.entry.is_container())
            .unwrap_or(false)
    }

    /// Loaded and non-empty. Unloaded containers report `false`.
    pub fn has_children(&self, id: NodeId) -> bool {
        self.first_child(id).is_some()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        let node = self.arena.get(id)?;
        if !node.get().loaded {
            return None;
        }
        node.first_child()
    }

    /// Returns `true` when the flag actually changed.
    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> bool {
        match self.get_mut(id) {
            Some(node) if node.expanded != expanded => {
                node.expanded = expanded;
                true
            }
            _ => false,
        }
    }

    pub fn toggle_expanded(&mut self, id: NodeId) -> bool {
        let expanded = self.is_expanded(id);
        self.set_expanded(id, !expanded)
    }

    /// List the entry synchronously and commit the result.
    /// No-op for leaves and already-loaded containers.
    pub fn load_children_if_needed(&mut self, id: NodeId) -> bool {
        if !self.needs_load(id) {
            return false;
        }
        let Some(entry) = self.entry(id).cloned() else {
            return false;
        };
        let listing = entry.list_children();
        self.commit_children(id, listing)
    }

    /// The single write that populates `children`. Refuses when the node is
    /// already loaded, so a late duplicate listing is dropped.
    pub fn commit_children(&mut self, id: NodeId, entries: Vec<SharedEntry>) -> bool {
        if !self.needs_load(id) {
            return false;
        }
        let level = match self.get_mut(id) {
            Some(node) => {
                node.loaded = true;
                node.level + 1
            }
            None => return false,
        };

        for entry in entries {
            let child = self.arena.new_node(ViewNode::new(entry, level));
            id.append(child, &mut self.arena);
        }
        true
    }

    /// Nodes a list widget should render, top to bottom.
    pub fn visible_depth_first(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_visible_recursive(self.root, &mut out);
        out
    }

    fn collect_visible_recursive(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let Some(node) = self.arena.get(id) else {
            return;
        };
        out.push(id);

        if node.get().expanded {
            for child in id.children(&self.arena) {
                self.collect_visible_recursive(child, out);
            }
        }
    }

    /// Materialized nodes with their depth, in depth-first order regardless of
    /// expand state.
    pub fn iter_depth_first(&self) -> impl Iterator<Item = (NodeId, usize)> + '_ {
        self.root
            .descendants(&self.arena)
            .filter_map(|id| self.level(id).map(|level| (id, level)))
    }
}
