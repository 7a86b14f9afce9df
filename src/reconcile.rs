//! Reconciliation: brings a fact's position back in line with the code as
//! it exists right now. Diff translation predicts where the line went;
//! fuzzy search corrects residual drift; a fact whose line cannot be found
//! is flagged stale but keeps its last known position, because a bookmark
//! is advisory and must always yield some usable location.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::fuzzy;
use crate::providers::{DocumentProvider, VcsProvider};
use crate::translate;
use crate::tree::RecordTree;
use crate::types::{LocationFact, PathStyle};

/// Result of reconciling a single fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The file is gone and no rename was found. The fact keeps its last
    /// known position, flagged deleted.
    Broken(&'static str),
    /// The line is where the fact said it was.
    Fresh,
    /// The line was found elsewhere and the fact was re-anchored.
    Moved {
        /// Position before reconciliation.
        from: u32,
        /// Position after reconciliation.
        to: u32,
    },
    /// Fuzzy search exhausted its radius. Position kept, flagged deleted.
    Stale,
}

/// One reconciliation pass. Holds the collaborators plus a pass-local memo
/// of diff text per (revision, file), so many facts sharing a pair cost one
/// version-control lookup.
pub struct Reconciler<'a> {
    /// Diff text memo; `None` records a lookup that failed.
    diff_memo: HashMap<(String, PathBuf), Option<String>>,
    /// Current document text.
    docs: &'a mut dyn DocumentProvider,
    /// Fuzzy search radius.
    radius: u32,
    /// Workspace root for path resolution.
    root: PathBuf,
    /// Path encoding for stored facts.
    style: PathStyle,
    /// Version-control access; may be entirely unavailable.
    vcs: &'a dyn VcsProvider,
}

impl<'a> Reconciler<'a> {
    /// A pass over the given collaborators.
    pub fn new(
        docs: &'a mut dyn DocumentProvider,
        vcs: &'a dyn VcsProvider,
        root: &Path,
        style: PathStyle,
        radius: u32,
    ) -> Self {
        return Self {
            diff_memo: HashMap::new(),
            docs,
            radius,
            root: root.to_path_buf(),
            style,
            vcs,
        };
    }

    /// Reconcile every bookmark in the tree. Results are applied back by
    /// path lookup, so a node removed while the pass runs is silently
    /// skipped rather than resurrected.
    pub fn reconcile_all(&mut self, tree: &mut RecordTree) -> Vec<(String, Outcome)> {
        let snapshot: Vec<(String, LocationFact)> = tree
            .leaves()
            .into_iter()
            .map(|(path, fact)| return (path, fact.clone()))
            .collect();

        let mut outcomes = Vec::with_capacity(snapshot.len());
        for (path, mut fact) in snapshot {
            let outcome = self.reconcile_one(&mut fact);
            if let Some(slot) = tree.get_fact_mut(&path) {
                *slot = fact;
                outcomes.push((path, outcome));
            }
        }
        return outcomes;
    }

    /// Reconcile one fact in place: translate its line across the diff
    /// since its recorded revision, then fuzzy-correct around the
    /// prediction. Missing revision, missing diff, or a git-less workspace
    /// all degrade to using the remembered line as the candidate.
    pub fn reconcile_one(&mut self, fact: &mut LocationFact) -> Outcome {
        let mut disk = self.style.resolve(&self.root, &fact.file);

        if self.docs.line_count(&disk).is_none() {
            match self.follow_rename(fact) {
                None => {
                    fact.deleted = true;
                    return Outcome::Broken("file not found");
                },
                Some(found) => disk = found,
            }
        }

        let mut candidate = fact.lineno;
        if let Some(revision) = fact.revision.clone()
            && self.vcs.revision_exists(&revision)
            && let Some(diff) = self.diff_for(&revision, &fact.file)
        {
            candidate = translate::translate_line(&diff, fact.lineno);
        }

        let Some(hit) = fuzzy::locate(self.docs, &disk, candidate, &fact.content, self.radius)
        else {
            fact.deleted = true;
            return Outcome::Stale;
        };

        let from = fact.lineno;
        fact.content = hit.text;
        fact.deleted = false;
        fact.lineno = hit.lineno;
        if let Some(head) = self.vcs.head_revision() {
            fact.revision = Some(head);
        }

        if hit.lineno == from {
            return Outcome::Fresh;
        }
        return Outcome::Moved { from, to: hit.lineno };
    }

    /// Ask version control whether the fact's file moved; on a hit,
    /// re-target the fact and return the new on-disk path if readable.
    fn follow_rename(&mut self, fact: &mut LocationFact) -> Option<PathBuf> {
        let revision = fact.revision.clone()?;
        let repo_path = self.repo_relative(&fact.file);
        let renamed = self.vcs.detect_rename(&revision, &repo_path)?;

        let stored = self.style.encode(&self.root, &renamed);
        let disk = self.style.resolve(&self.root, &stored);
        if self.docs.line_count(&disk).is_none() {
            return None;
        }
        fact.file = stored;
        return Some(disk);
    }

    /// Memoized diff lookup for one (revision, file) pair.
    fn diff_for(&mut self, revision: &str, file: &Path) -> Option<String> {
        let repo_path = self.repo_relative(file);
        let key = (revision.to_string(), repo_path.clone());
        if !self.diff_memo.contains_key(&key) {
            let diff = self.vcs.diff_since(revision, &repo_path);
            self.diff_memo.insert(key.clone(), diff);
        }
        return self.diff_memo.get(&key).cloned().flatten();
    }

    /// Strip the workspace root so stored absolute paths still address the
    /// repository the way version control expects.
    fn repo_relative(&self, stored: &Path) -> PathBuf {
        return stored.strip_prefix(&self.root).unwrap_or(stored).to_path_buf();
    }
}
