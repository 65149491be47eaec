use indextree::NodeId;
use serde::{Deserialize, Serialize};

use crate::tree::ViewTree;

/// Rows kept visible around the selection when scrolling.
pub const DEFAULT_SCROLL_MARGIN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Escape,
    Up,
    Down,
    Left,
    Right,
}

/// What Up/Down do when nothing is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySelection {
    #[default]
    Ignore,
    SelectFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavPolicy {
    pub on_empty_selection: EmptySelection,
    /// Up on the first row selects the last one and vice versa.
    pub wrap: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavOutcome {
    pub selected: Option<NodeId>,
    /// Set when an expand flag was flipped and the visible list is stale.
    pub tree_changed: bool,
}

impl NavOutcome {
    fn unchanged(selected: Option<NodeId>) -> Self {
        Self {
            selected,
            tree_changed: false,
        }
    }
}

/// Apply one navigation key to `selected` over the flattened `visible` list.
///
/// Out-of-range or meaningless moves leave the selection as it was.
pub fn navigate(
    tree: &mut ViewTree,
    visible: &[NodeId],
    selected: Option<NodeId>,
    key: NavKey,
    policy: NavPolicy,
) -> NavOutcome {
    match key {
        NavKey::Escape => NavOutcome::unchanged(None),
        NavKey::Up | NavKey::Down => {
            NavOutcome::unchanged(step(visible, selected, key == NavKey::Down, policy))
        }
        NavKey::Right => {
            let Some(current) = selected else {
                return NavOutcome::unchanged(None);
            };
            match tree.first_child(current) {
                Some(child) => NavOutcome {
                    tree_changed: tree.set_expanded(current, true),
                    selected: Some(child),
                },
                None => NavOutcome::unchanged(selected),
            }
        }
        NavKey::Left => {
            let Some(current) = selected else {
                return NavOutcome::unchanged(None);
            };
            match tree.parent(current) {
                Some(parent) => NavOutcome {
                    tree_changed: tree.set_expanded(parent, false),
                    selected: Some(parent),
                },
                None => NavOutcome::unchanged(selected),
            }
        }
    }
}

fn step(
    visible: &[NodeId],
    selected: Option<NodeId>,
    forward: bool,
    policy: NavPolicy,
) -> Option<NodeId> {
    if visible.is_empty() {
        return selected;
    }
    let last = visible.len() - 1;

    let Some(index) = selected.and_then(|id| visible.iter().position(|&v| v == id)) else {
        return match policy.on_empty_selection {
            EmptySelection::Ignore => selected,
            EmptySelection::SelectFirst => Some(visible[0]),
        };
    };

    let next = match (forward, index) {
        (true, i) if i < last => i + 1,
        (true, _) if policy.wrap => 0,
        (false, i) if i > 0 => i - 1,
        (false, _) if policy.wrap => last,
        _ => return selected,
    };
    Some(visible[next])
}

/// Window of rows currently shown by a virtualized list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub first_row: usize,
    pub rows: usize,
}

impl Viewport {
    pub fn new(first_row: usize, rows: usize) -> Self {
        Self { first_row, rows }
    }

    /// Build a row window from a pixel scroll offset and height.
    pub fn from_pixels(scroll_px: f32, height_px: f32, item_height_px: f32) -> Self {
        if item_height_px <= 0.0 {
            return Self::default();
        }
        Self {
            first_row: (scroll_px.max(0.0) / item_height_px).floor() as usize,
            rows: (height_px.max(0.0) / item_height_px).floor() as usize,
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.first_row && index < self.first_row + self.rows
    }
}

/// First row to show so `index` sits at least `margin` rows from either
/// edge. Returns the current first row when no scroll is needed.
pub fn scroll_to_reveal(index: usize, viewport: Viewport, margin: usize, total_rows: usize) -> usize {
    if viewport.rows == 0 || total_rows == 0 {
        return 0;
    }
    let max_first = total_rows.saturating_sub(viewport.rows);
    // A margin larger than half the window would make both edges unreachable.
    let margin = margin.min(viewport.rows.saturating_sub(1) / 2);

    let mut first = viewport.first_row;
    if index < first + margin {
        first = index.saturating_sub(margin);
    } else if index + margin >= first + viewport.rows {
        first = index + margin + 1 - viewport.rows;
    }
    first.min(max_first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::testing::MemEntry;

    /// root (expanded)
    ///   a (collapsed, has a1)
    ///   b (leaf)
    fn sample() -> (ViewTree, NodeId, NodeId, NodeId) {
        let a = MemEntry::dir("a", vec![MemEntry::file("a1")]);
        let mut tree = ViewTree::new(MemEntry::dir("root", vec![a, MemEntry::file("b")]));
        let root = tree.root();
        tree.load_children_if_needed(root);
        let children = tree.children(root);
        tree.load_children_if_needed(children[0]);
        (tree, root, children[0], children[1])
    }

    #[test]
    fn test_escape_clears_selection_only() {
        let (mut tree, root, a, _) = sample();
        let visible = tree.visible_depth_first();
        let outcome = navigate(&mut tree, &visible, Some(a), NavKey::Escape, NavPolicy::default());
        assert_eq!(outcome.selected, None);
        assert!(!outcome.tree_changed);
        assert!(tree.is_expanded(root));
    }

    #[test]
    fn test_up_down_move_through_visible_list() {
        let (mut tree, root, a, b) = sample();
        let visible = tree.visible_depth_first();
        let policy = NavPolicy::default();

        assert_eq!(navigate(&mut tree, &visible, Some(root), NavKey::Down, policy).selected, Some(a));
        assert_eq!(navigate(&mut tree, &visible, Some(a), NavKey::Down, policy).selected, Some(b));
        assert_eq!(navigate(&mut tree, &visible, Some(b), NavKey::Up, policy).selected, Some(a));
    }

    #[test]
    fn test_edges_are_no_ops_without_wrap() {
        let (mut tree, root, _, b) = sample();
        let visible = tree.visible_depth_first();
        let policy = NavPolicy::default();

        assert_eq!(navigate(&mut tree, &visible, Some(b), NavKey::Down, policy).selected, Some(b));
        assert_eq!(navigate(&mut tree, &visible, Some(root), NavKey::Up, policy).selected, Some(root));
        assert_eq!(navigate(&mut tree, &visible, None, NavKey::Down, policy).selected, None);
    }

    #[test]
    fn test_policy_wrap_and_select_first() {
        let (mut tree, root, _, b) = sample();
        let visible = tree.visible_depth_first();
        let policy = NavPolicy {
            on_empty_selection: EmptySelection::SelectFirst,
            wrap: true,
        };

        assert_eq!(navigate(&mut tree, &visible, None, NavKey::Up, policy).selected, Some(root));
        assert_eq!(navigate(&mut tree, &visible, Some(b), NavKey::Down, policy).selected, Some(root));
        assert_eq!(navigate(&mut tree, &visible, Some(root), NavKey::Up, policy).selected, Some(b));
    }

    #[test]
    fn test_right_expands_and_left_collapses() {
        let (mut tree, _, a, _) = sample();
        let visible = tree.visible_depth_first();
        let policy = NavPolicy::default();

        let right = navigate(&mut tree, &visible, Some(a), NavKey::Right, policy);
        assert!(right.tree_changed);
        assert!(tree.is_expanded(a));
        let a1 = right.selected.unwrap();
        assert_eq!(tree.parent(a1), Some(a));
        assert!(tree.visible_depth_first().contains(&a1));

        let visible = tree.visible_depth_first();
        let left = navigate(&mut tree, &visible, Some(a1), NavKey::Left, policy);
        assert_eq!(left.selected, Some(a));
        assert!(left.tree_changed);
        assert!(!tree.is_expanded(a));
    }

    #[test]
    fn test_right_on_leaf_and_left_on_root_are_no_ops() {
        let (mut tree, root, _, b) = sample();
        let visible = tree.visible_depth_first();
        let policy = NavPolicy::default();

        let right = navigate(&mut tree, &visible, Some(b), NavKey::Right, policy);
        assert_eq!(right, NavOutcome::unchanged(Some(b)));

        let left = navigate(&mut tree, &visible, Some(root), NavKey::Left, policy);
        assert_eq!(left, NavOutcome::unchanged(Some(root)));
        assert!(tree.is_expanded(root));
    }

    #[test]
    fn test_scroll_keeps_margin_rows() {
        let view = Viewport::new(0, 10);
        assert_eq!(scroll_to_reveal(4, view, 3, 100), 0);
        assert_eq!(scroll_to_reveal(7, view, 3, 100), 1);
        assert_eq!(scroll_to_reveal(20, view, 3, 100), 14);

        let scrolled = Viewport::new(14, 10);
        assert_eq!(scroll_to_reveal(15, scrolled, 3, 100), 12);
        assert_eq!(scroll_to_reveal(1, scrolled, 3, 100), 0);
    }

    #[test]
    fn test_scroll_clamps_to_list_end() {
        let view = Viewport::new(0, 10);
        assert_eq!(scroll_to_reveal(11, view, 3, 12), 2);
        assert_eq!(scroll_to_reveal(3, Viewport::new(0, 0), 3, 12), 0);
    }

    #[test]
    fn test_viewport_from_pixels() {
        let view = Viewport::from_pixels(72.0, 240.0, 24.0);
        assert_eq!(view, Viewport::new(3, 10));
        assert!(view.contains(3));
        assert!(!view.contains(13));
    }
}
