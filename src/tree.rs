//! The path-addressable bookmark tree: structural find, insert, remove,
//! and rename. Serialization lives in `persist`.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::types::LocationFact;

/// What a node holds: exactly one of a bookmark or a child set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A folder. Children are keyed by label, which keeps sibling labels
    /// unique and listing order deterministic.
    Interior(BTreeMap<String, RecordNode>),
    /// A bookmark.
    Leaf(LocationFact),
}

/// One node of the bookmark tree. The slash-joined labels from the root
/// down to a node form its unique address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordNode {
    /// Label unique among siblings. Empty only for the root.
    pub label: String,
    /// Bookmark or child set.
    pub payload: Payload,
}

impl RecordNode {
    /// A new empty folder node.
    pub fn folder(label: &str) -> Self {
        return Self { label: label.to_string(), payload: Payload::Interior(BTreeMap::new()) };
    }

    /// A new bookmark node.
    pub fn bookmark(label: &str, fact: LocationFact) -> Self {
        return Self { label: label.to_string(), payload: Payload::Leaf(fact) };
    }

    /// Child lookup by label. `None` for bookmarks.
    pub fn child(&self, label: &str) -> Option<&RecordNode> {
        return match &self.payload {
            Payload::Interior(children) => children.get(label),
            Payload::Leaf(_) => None,
        };
    }
}

/// The whole tree. The root is a distinguished unlabeled folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTree {
    /// The unlabeled root folder.
    pub root: RecordNode,
}

impl Default for RecordTree {
    /// An empty tree.
    fn default() -> Self {
        return Self::new();
    }
}

impl RecordTree {
    /// A tree with an empty root folder.
    pub fn new() -> Self {
        return Self { root: RecordNode::folder("") };
    }

    /// Walk children label by label, stopping at the first unmatched
    /// segment. Returns how many segments matched and the node reached.
    /// Never fails — a partial match tells the caller where new nodes
    /// would splice in.
    pub fn find_down(&self, segments: &[String]) -> (usize, &RecordNode) {
        let mut node = &self.root;
        let mut depth = 0_usize;

        for segment in segments {
            let Some(next) = node.child(segment) else {
                break;
            };
            node = next;
            depth = depth.saturating_add(1);
        }

        return (depth, node);
    }

    /// Look up a node by slash-joined path. `""` is the root.
    pub fn get(&self, path: &str) -> Option<&RecordNode> {
        let segments = split_path(path);
        let (depth, node) = self.find_down(&segments);
        if depth == segments.len() {
            return Some(node);
        }
        return None;
    }

    /// Mutable access to the bookmark at `path`, if one is there.
    pub fn get_fact_mut(&mut self, path: &str) -> Option<&mut LocationFact> {
        let segments = split_path(path);
        let mut node = &mut self.root;
        for segment in &segments {
            let Payload::Interior(children) = &mut node.payload else {
                return None;
            };
            node = children.get_mut(segment)?;
        }
        return match &mut node.payload {
            Payload::Interior(_) => None,
            Payload::Leaf(fact) => Some(fact),
        };
    }

    /// Insert a bookmark at `path`, synthesizing missing folders along the
    /// way. Re-inserting over an existing bookmark replaces its fact.
    ///
    /// # Errors
    ///
    /// Returns `Error::PathNotFound` for an empty path,
    /// `Error::LeafNotFolder` if a non-final segment is a bookmark,
    /// or `Error::FolderExists` if the final segment is a folder.
    pub fn insert(&mut self, path: &str, fact: LocationFact) -> Result<(), Error> {
        let segments = split_path(path);
        let Some(label) = segments.last() else {
            return Err(Error::PathNotFound { path: path.to_string() });
        };
        return self.attach(&segments, RecordNode::bookmark(label, fact));
    }

    /// Detach the node at `path` from its parent's child set and return it.
    /// The subtree below it goes with it.
    ///
    /// # Errors
    ///
    /// Returns `Error::RootNotRemovable` for the empty path,
    /// `Error::LeafNotFolder` if a non-final segment is a bookmark,
    /// or `Error::PathNotFound` if the path does not resolve.
    pub fn remove(&mut self, path: &str) -> Result<RecordNode, Error> {
        let segments = split_path(path);
        let Some((label, parents)) = segments.split_last() else {
            return Err(Error::RootNotRemovable);
        };

        let parent = self.descend_mut(parents, path)?;
        let Payload::Interior(children) = &mut parent.payload else {
            return Err(Error::LeafNotFolder { path: parents.join("/") });
        };
        return children
            .remove(label)
            .ok_or_else(|| return Error::PathNotFound { path: path.to_string() });
    }

    /// Move the node at `old_path` (and everything under it) to `new_path`.
    /// Remove-then-reinsert; the destination is checked up front so a
    /// failing rename leaves the tree untouched.
    ///
    /// # Errors
    ///
    /// Returns `Error::DestinationExists` if `new_path` is occupied,
    /// `Error::RenameUnderSelf` if `new_path` lies inside the moved subtree,
    /// `Error::LeafNotFolder` if a destination prefix is a bookmark,
    /// plus the errors of `remove`.
    pub fn rename(&mut self, old_path: &str, new_path: &str) -> Result<(), Error> {
        let segments = split_path(new_path);
        let Some((label, parents)) = segments.split_last() else {
            return Err(Error::PathNotFound { path: new_path.to_string() });
        };
        let label = label.clone();

        let old_segments = split_path(old_path);
        if !old_segments.is_empty()
            && segments.len() > old_segments.len()
            && segments[..old_segments.len()] == old_segments[..]
        {
            return Err(Error::RenameUnderSelf {
                new_path: new_path.to_string(),
                old_path: old_path.to_string(),
            });
        }

        if self.get(new_path).is_some() {
            return Err(Error::DestinationExists { path: new_path.to_string() });
        }
        self.check_attachable(parents)?;

        let mut node = self.remove(old_path)?;
        node.label = label;
        return self.attach(&segments, node);
    }

    /// All bookmarks in the tree with their slash-joined paths, in label
    /// order at every level.
    pub fn leaves(&self) -> Vec<(String, &LocationFact)> {
        let mut out = Vec::new();
        collect_leaves(&self.root, "", &mut out);
        return out;
    }

    /// Attach `node` as the final segment of `segments`, synthesizing
    /// missing folders for every intermediate segment.
    fn attach(&mut self, segments: &[String], node: RecordNode) -> Result<(), Error> {
        let Some((label, parents)) = segments.split_last() else {
            return Err(Error::PathNotFound { path: String::new() });
        };

        let full_path = segments.join("/");
        let parent = self.walk_interior_mut(parents, &full_path)?;
        let Payload::Interior(children) = &mut parent.payload else {
            return Err(Error::LeafNotFolder { path: parents.join("/") });
        };
        if let Some(existing) = children.get(label)
            && matches!(existing.payload, Payload::Interior(_))
        {
            return Err(Error::FolderExists { path: full_path });
        }
        children.insert(label.clone(), node);
        return Ok(());
    }

    /// Verify that every existing node along `segments` is a folder, without
    /// creating anything.
    ///
    /// # Errors
    ///
    /// Returns `Error::LeafNotFolder` when a segment resolves to a bookmark.
    fn check_attachable(&self, segments: &[String]) -> Result<(), Error> {
        let mut node = &self.root;
        let mut walked: Vec<&str> = Vec::new();

        for segment in segments {
            walked.push(segment);
            let Some(next) = node.child(segment) else {
                return Ok(());
            };
            if matches!(next.payload, Payload::Leaf(_)) {
                return Err(Error::LeafNotFolder { path: walked.join("/") });
            }
            node = next;
        }

        return Ok(());
    }

    /// Walk down existing `segments` without creating anything.
    ///
    /// # Errors
    ///
    /// Returns `Error::PathNotFound` if a segment is missing,
    /// or `Error::LeafNotFolder` when one resolves to a bookmark.
    fn descend_mut(&mut self, segments: &[String], full_path: &str) -> Result<&mut RecordNode, Error> {
        let mut node = &mut self.root;
        let mut walked: Vec<&str> = Vec::new();

        for segment in segments {
            let Payload::Interior(children) = &mut node.payload else {
                return Err(Error::LeafNotFolder { path: walked.join("/") });
            };
            walked.push(segment);
            node = children
                .get_mut(segment)
                .ok_or_else(|| return Error::PathNotFound { path: full_path.to_string() })?;
        }

        return Ok(node);
    }

    /// Walk down `segments`, creating folders where nothing exists, and
    /// return the final folder mutably.
    ///
    /// # Errors
    ///
    /// Returns `Error::LeafNotFolder` when a segment resolves to a bookmark.
    fn walk_interior_mut(&mut self, segments: &[String], full_path: &str) -> Result<&mut RecordNode, Error> {
        let mut node = &mut self.root;
        let mut walked: Vec<&str> = Vec::new();

        for segment in segments {
            walked.push(segment);
            let Payload::Interior(children) = &mut node.payload else {
                return Err(Error::LeafNotFolder { path: full_path.to_string() });
            };
            node = children
                .entry(segment.clone())
                .or_insert_with(|| return RecordNode::folder(segment));
            if matches!(node.payload, Payload::Leaf(_)) {
                return Err(Error::LeafNotFolder { path: walked.join("/") });
            }
        }

        return Ok(node);
    }
}

/// Split a slash-joined path into non-empty segments.
pub fn split_path(path: &str) -> Vec<String> {
    return path.split('/').filter(|s| return !s.is_empty()).map(String::from).collect();
}

/// Depth-first leaf collection in child order.
fn collect_leaves<'a>(node: &'a RecordNode, prefix: &str, out: &mut Vec<(String, &'a LocationFact)>) {
    match &node.payload {
        Payload::Interior(children) => {
            for (label, child) in children {
                let path = if prefix.is_empty() {
                    label.clone()
                } else {
                    format!("{prefix}/{label}")
                };
                collect_leaves(child, &path, out);
            }
        },
        Payload::Leaf(fact) => out.push((prefix.to_string(), fact)),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn fact(line: u32) -> LocationFact {
        return LocationFact {
            content: format!("line {line}"),
            deleted: false,
            file: PathBuf::from("src/main.rs"),
            lineno: line,
            revision: None,
        };
    }

    #[test]
    fn add_then_find_matches_full_depth() {
        let mut tree = RecordTree::new();
        tree.insert("notes/parser/loop", fact(7)).unwrap();

        let segments = split_path("notes/parser/loop");
        let (depth, node) = tree.find_down(&segments);
        assert_eq!(depth, 3);
        assert!(matches!(&node.payload, Payload::Leaf(f) if f.lineno == 7));
    }

    #[test]
    fn remove_then_find_matches_partial_depth() {
        let mut tree = RecordTree::new();
        tree.insert("notes/parser/loop", fact(7)).unwrap();
        tree.remove("notes/parser/loop").unwrap();

        let segments = split_path("notes/parser/loop");
        let (depth, _node) = tree.find_down(&segments);
        assert!(depth < segments.len());
        assert_eq!(depth, 2);
    }

    #[test]
    fn insert_through_bookmark_is_structural_error() {
        let mut tree = RecordTree::new();
        tree.insert("notes/here", fact(1)).unwrap();

        let err = tree.insert("notes/here/deeper", fact(2)).unwrap_err();
        assert!(matches!(err, Error::LeafNotFolder { path } if path == "notes/here"));
    }

    #[test]
    fn insert_over_folder_is_structural_error() {
        let mut tree = RecordTree::new();
        tree.insert("notes/a", fact(1)).unwrap();

        let err = tree.insert("notes", fact(2)).unwrap_err();
        assert!(matches!(err, Error::FolderExists { .. }));
    }

    #[test]
    fn reinsert_replaces_the_fact() {
        let mut tree = RecordTree::new();
        tree.insert("notes/a", fact(1)).unwrap();
        tree.insert("notes/a", fact(9)).unwrap();

        let node = tree.get("notes/a").unwrap();
        assert!(matches!(&node.payload, Payload::Leaf(f) if f.lineno == 9));
    }

    #[test]
    fn removing_root_is_invalid() {
        let mut tree = RecordTree::new();
        assert!(matches!(tree.remove(""), Err(Error::RootNotRemovable)));
    }

    #[test]
    fn removing_missing_path_reports_not_found() {
        let mut tree = RecordTree::new();
        tree.insert("notes/a", fact(1)).unwrap();
        assert!(matches!(tree.remove("notes/b"), Err(Error::PathNotFound { .. })));
    }

    #[test]
    fn rename_moves_a_whole_subtree() {
        let mut tree = RecordTree::new();
        tree.insert("old/a", fact(1)).unwrap();
        tree.insert("old/b", fact(2)).unwrap();
        tree.rename("old", "archive/old").unwrap();

        assert!(tree.get("old").is_none());
        assert!(tree.get("archive/old/a").is_some());
        assert!(tree.get("archive/old/b").is_some());
    }

    #[test]
    fn rename_into_own_subtree_is_rejected() {
        let mut tree = RecordTree::new();
        tree.insert("a/b", fact(1)).unwrap();

        let err = tree.rename("a", "a/b/c").unwrap_err();
        assert!(matches!(err, Error::RenameUnderSelf { .. }));
        assert!(tree.get("a/b").is_some(), "rejected rename must leave the tree untouched");
        assert!(tree.get("a/b/c").is_none());
    }

    #[test]
    fn leaves_walk_in_label_order() {
        let mut tree = RecordTree::new();
        tree.insert("z", fact(1)).unwrap();
        tree.insert("a/inner", fact(2)).unwrap();
        tree.insert("m", fact(3)).unwrap();

        let paths: Vec<String> = tree.leaves().into_iter().map(|(p, _)| return p).collect();
        assert_eq!(paths, vec!["a/inner".to_string(), "m".to_string(), "z".to_string()]);
    }

    #[test]
    fn partial_find_reports_splice_point() {
        let mut tree = RecordTree::new();
        tree.insert("notes/parser/loop", fact(7)).unwrap();

        let segments = split_path("notes/lexer/skip");
        let (depth, node) = tree.find_down(&segments);
        assert_eq!(depth, 1);
        assert_eq!(node.label, "notes");
    }
}
