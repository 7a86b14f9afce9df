//! Derived checked state: mirrors the external breakpoint set onto the
//! bookmark tree and back, reporting the smallest subtree that changed.

use std::collections::{BTreeSet, HashMap};

use crate::error::Error;
use crate::providers::BreakpointStore;
use crate::tree::{Payload, RecordNode, RecordTree};
use crate::types::Breakpoint;

/// Checked-state bookkeeping for one tree. States are derived, keyed by
/// slash-joined path, and never persisted.
#[derive(Default)]
pub struct CheckboxSync {
    /// Last computed checked state per node path. Empty path is the root.
    states: HashMap<String, bool>,
    /// Reentrancy flag: held while a user-initiated toggle runs so the
    /// breakpoint-set notification it causes cannot start a second
    /// downward recompute.
    syncing: bool,
}

impl CheckboxSync {
    /// Fresh state with nothing computed yet.
    pub fn new() -> Self {
        return Self { states: HashMap::new(), syncing: false };
    }

    /// The last computed state for a node. Unknown paths are unchecked.
    pub fn state(&self, path: &str) -> bool {
        return self.states.get(path).copied().unwrap_or(false);
    }

    /// Downward pass: recompute every node's checked state from the
    /// breakpoint set, children before parents. Returns the path of the
    /// single node whose subtree covers every change — the lowest common
    /// ancestor of all changed nodes — or `None` when nothing changed.
    /// The empty path means the whole tree.
    pub fn recompute(&mut self, tree: &RecordTree, breakpoints: &BTreeSet<Breakpoint>) -> Option<String> {
        return recompute_states(tree, breakpoints, &mut self.states);
    }

    /// Entry point for breakpoint-set change notifications. Ignored while
    /// a toggle holds the guard; otherwise a full downward recompute.
    pub fn on_breakpoints_changed(
        &mut self,
        tree: &RecordTree,
        breakpoints: &BTreeSet<Breakpoint>,
    ) -> Option<String> {
        if self.syncing {
            return None;
        }
        return self.recompute(tree, breakpoints);
    }

    /// Upward pass: toggle the node at `path`. A bookmark flips its own
    /// breakpoint; a folder drives every bookmark below it to one target
    /// state (the negation of the folder's current derived state), so
    /// mixed children always come out uniform and in step with the store.
    /// Returns the change root of the recompute that follows.
    ///
    /// # Errors
    ///
    /// Returns `Error::PathNotFound` if `path` does not resolve.
    pub fn toggle(
        &mut self,
        tree: &RecordTree,
        path: &str,
        store: &mut dyn BreakpointStore,
    ) -> Result<Option<String>, Error> {
        return self.with_guard(|sync| {
            apply_toggle(tree, path, store)?;
            let breakpoints = store.enumerate();
            return Ok(recompute_states(tree, &breakpoints, &mut sync.states));
        });
    }

    /// Run `f` with the reentrancy guard held for exactly its duration.
    pub fn with_guard<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.syncing = true;
        let out = f(self);
        self.syncing = false;
        return out;
    }
}

/// Post-order recompute over the whole tree. See `CheckboxSync::recompute`.
fn recompute_states(
    tree: &RecordTree,
    breakpoints: &BTreeSet<Breakpoint>,
    states: &mut HashMap<String, bool>,
) -> Option<String> {
    let mut fresh = HashMap::new();
    let (_checked, report) = visit(&tree.root, "", breakpoints, states, &mut fresh);
    *states = fresh;
    return report;
}

/// Compute one node's state and change report, children first.
///
/// A node is the change root of its branch when its own state flipped or
/// more than one child reported a change; a single child report passes
/// through untouched.
fn visit(
    node: &RecordNode,
    path: &str,
    breakpoints: &BTreeSet<Breakpoint>,
    old_states: &HashMap<String, bool>,
    new_states: &mut HashMap<String, bool>,
) -> (bool, Option<String>) {
    let old = old_states.get(path).copied().unwrap_or(false);

    let (checked, child_reports) = match &node.payload {
        Payload::Interior(children) => {
            let mut reports: Vec<String> = Vec::new();
            let mut all_checked = true;
            for (label, child) in children {
                let child_path = join_path(path, label);
                let (child_checked, child_report) =
                    visit(child, &child_path, breakpoints, old_states, new_states);
                all_checked = all_checked && child_checked;
                if let Some(report) = child_report {
                    reports.push(report);
                }
            }
            // A folder with no children mirrors no breakpoints: unchecked.
            (all_checked && !children.is_empty(), reports)
        },
        Payload::Leaf(fact) => (breakpoints.contains(&fact.breakpoint()), Vec::new()),
    };

    new_states.insert(path.to_string(), checked);

    let own_changed = old != checked;
    if own_changed || child_reports.len() > 1 {
        return (checked, Some(path.to_string()));
    }
    return (checked, child_reports.into_iter().next());
}

/// Flip the breakpoint(s) for the node at `path`.
fn apply_toggle(tree: &RecordTree, path: &str, store: &mut dyn BreakpointStore) -> Result<(), Error> {
    let Some(node) = tree.get(path) else {
        return Err(Error::PathNotFound { path: path.to_string() });
    };

    match &node.payload {
        Payload::Interior(_) => {
            let present = store.enumerate();
            let leaf_bps: Vec<Breakpoint> = subtree_breakpoints(node);
            // Target is the negation of the folder's current derived state.
            let all_set = !leaf_bps.is_empty() && leaf_bps.iter().all(|bp| return present.contains(bp));
            for bp in &leaf_bps {
                if all_set {
                    store.remove(bp);
                } else {
                    store.add(bp);
                }
            }
        },
        Payload::Leaf(fact) => {
            let bp = fact.breakpoint();
            if store.enumerate().contains(&bp) {
                store.remove(&bp);
            } else {
                store.add(&bp);
            }
        },
    }
    return Ok(());
}

/// Breakpoints for every bookmark under a node, in child order.
fn subtree_breakpoints(node: &RecordNode) -> Vec<Breakpoint> {
    return match &node.payload {
        Payload::Interior(children) => {
            children.values().flat_map(subtree_breakpoints).collect()
        },
        Payload::Leaf(fact) => vec![fact.breakpoint()],
    };
}

/// Join a parent path and a child label.
fn join_path(parent: &str, label: &str) -> String {
    if parent.is_empty() {
        return label.to_string();
    }
    return format!("{parent}/{label}");
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    use super::*;
    use crate::types::LocationFact;

    fn fact(file: &str, line: u32) -> LocationFact {
        return LocationFact {
            content: String::new(),
            deleted: false,
            file: PathBuf::from(file),
            lineno: line,
            revision: None,
        };
    }

    fn bp(file: &str, line: u32) -> Breakpoint {
        return Breakpoint { file: PathBuf::from(file), line };
    }

    /// In-memory breakpoint store for toggle tests.
    #[derive(Default)]
    struct MemStore(BTreeSet<Breakpoint>);

    impl BreakpointStore for MemStore {
        fn add(&mut self, bp: &Breakpoint) {
            self.0.insert(bp.clone());
        }

        fn enumerate(&self) -> BTreeSet<Breakpoint> {
            return self.0.clone();
        }

        fn remove(&mut self, bp: &Breakpoint) {
            self.0.remove(bp);
        }
    }

    fn sample_tree() -> RecordTree {
        let mut tree = RecordTree::new();
        tree.insert("grp/a", fact("src/a.rs", 1)).unwrap();
        tree.insert("grp/b", fact("src/b.rs", 2)).unwrap();
        tree.insert("solo", fact("src/c.rs", 3)).unwrap();
        return tree;
    }

    #[test]
    fn folder_checked_when_all_children_checked() {
        let tree = sample_tree();
        let mut sync = CheckboxSync::new();
        let bps: BTreeSet<Breakpoint> = [bp("src/a.rs", 1), bp("src/b.rs", 2)].into();

        sync.recompute(&tree, &bps);
        assert!(sync.state("grp"));
        assert!(sync.state("grp/a"));
        assert!(!sync.state("solo"));
        assert!(!sync.state(""));
    }

    #[test]
    fn empty_folder_is_unchecked() {
        let mut tree = RecordTree::new();
        tree.insert("empty/x", fact("src/a.rs", 1)).unwrap();
        tree.remove("empty/x").unwrap();

        let mut sync = CheckboxSync::new();
        sync.recompute(&tree, &BTreeSet::new());
        assert!(!sync.state("empty"));
    }

    #[test]
    fn single_leaf_flip_reports_that_leaf() {
        let tree = sample_tree();
        let mut sync = CheckboxSync::new();
        sync.recompute(&tree, &BTreeSet::new());

        let bps: BTreeSet<Breakpoint> = [bp("src/a.rs", 1)].into();
        let root = sync.recompute(&tree, &bps);
        assert_eq!(root.as_deref(), Some("grp/a"));
    }

    #[test]
    fn two_flipped_leaves_report_their_common_ancestor() {
        let tree = sample_tree();
        let mut sync = CheckboxSync::new();
        // Start with a checked, b unchecked: grp stays unchecked either way.
        let initial: BTreeSet<Breakpoint> = [bp("src/a.rs", 1)].into();
        sync.recompute(&tree, &initial);

        // Flip both children in one pass; grp's own state does not change.
        let after: BTreeSet<Breakpoint> = [bp("src/b.rs", 2)].into();
        let root = sync.recompute(&tree, &after);
        assert_eq!(root.as_deref(), Some("grp"));
    }

    #[test]
    fn flips_in_separate_subtrees_report_the_root() {
        let tree = sample_tree();
        let mut sync = CheckboxSync::new();
        let initial: BTreeSet<Breakpoint> = [bp("src/a.rs", 1), bp("src/c.rs", 3)].into();
        sync.recompute(&tree, &initial);

        let after: BTreeSet<Breakpoint> = [bp("src/b.rs", 2)].into();
        let root = sync.recompute(&tree, &after);
        assert_eq!(root.as_deref(), Some(""));
    }

    #[test]
    fn unchanged_set_reports_nothing() {
        let tree = sample_tree();
        let mut sync = CheckboxSync::new();
        let bps: BTreeSet<Breakpoint> = [bp("src/a.rs", 1)].into();
        sync.recompute(&tree, &bps);
        assert_eq!(sync.recompute(&tree, &bps), None);
    }

    #[test]
    fn leaf_toggle_adds_then_removes_the_breakpoint() {
        let tree = sample_tree();
        let mut sync = CheckboxSync::new();
        let mut store = MemStore::default();

        sync.toggle(&tree, "solo", &mut store).unwrap();
        assert!(store.enumerate().contains(&bp("src/c.rs", 3)));
        assert!(sync.state("solo"));

        sync.toggle(&tree, "solo", &mut store).unwrap();
        assert!(store.enumerate().is_empty());
        assert!(!sync.state("solo"));
    }

    #[test]
    fn folder_toggle_makes_mixed_children_uniform() {
        let tree = sample_tree();
        let mut sync = CheckboxSync::new();
        let mut store = MemStore::default();
        store.add(&bp("src/a.rs", 1));

        // Mixed: a set, b unset. Folder state is unchecked, so the target
        // is checked and both leaves end up with breakpoints.
        sync.toggle(&tree, "grp", &mut store).unwrap();
        assert!(store.enumerate().contains(&bp("src/a.rs", 1)));
        assert!(store.enumerate().contains(&bp("src/b.rs", 2)));
        assert!(sync.state("grp"));

        // Now uniform: a second toggle clears both.
        sync.toggle(&tree, "grp", &mut store).unwrap();
        assert!(!store.enumerate().contains(&bp("src/a.rs", 1)));
        assert!(!store.enumerate().contains(&bp("src/b.rs", 2)));
    }

    #[test]
    fn toggle_of_missing_path_is_not_found() {
        let tree = sample_tree();
        let mut sync = CheckboxSync::new();
        let mut store = MemStore::default();
        assert!(matches!(
            sync.toggle(&tree, "no/such", &mut store),
            Err(Error::PathNotFound { .. })
        ));
    }

    #[test]
    fn notification_during_guard_is_suppressed() {
        let tree = sample_tree();
        let mut sync = CheckboxSync::new();
        let bps: BTreeSet<Breakpoint> = [bp("src/a.rs", 1)].into();

        let suppressed = sync.with_guard(|s| return s.on_breakpoints_changed(&tree, &bps));
        assert_eq!(suppressed, None);
        assert!(!sync.state("grp/a"), "guarded notification must not recompute");

        // The same notification after the guard drops goes through.
        let root = sync.on_breakpoints_changed(&tree, &bps);
        assert!(root.is_some());
        assert!(sync.state("grp/a"));
    }
}
