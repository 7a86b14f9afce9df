//! Collaborator surfaces the reconciliation core consumes: documents,
//! version control, and the external breakpoint set. Concrete providers
//! live beside the traits; any external failure degrades to `None` so the
//! core can fall back to pass-through behavior.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::Error;
use crate::types::Breakpoint;

// ── Documents ─────────────────────────────────────────────────────────

/// Line-level read access to current document text.
pub trait DocumentProvider {
    /// Number of lines in the file, or `None` if it cannot be read.
    fn line_count(&mut self, file: &Path) -> Option<u32>;
    /// Text of one zero-based line.
    fn line_text(&mut self, file: &Path, lineno: u32) -> Option<String>;
}

/// Filesystem-backed documents with a per-pass line cache, so a bulk
/// reconciliation reads each file once.
#[derive(Default)]
pub struct FsDocuments {
    /// Cached line vectors; `None` marks a file that failed to read.
    cache: HashMap<PathBuf, Option<Vec<String>>>,
}

impl FsDocuments {
    /// A provider with an empty cache.
    pub fn new() -> Self {
        return Self { cache: HashMap::new() };
    }

    /// Load (or fetch cached) lines for a file.
    fn lines(&mut self, file: &Path) -> Option<&Vec<String>> {
        return self
            .cache
            .entry(file.to_path_buf())
            .or_insert_with(|| {
                return std::fs::read_to_string(file)
                    .ok()
                    .map(|c| return c.lines().map(String::from).collect());
            })
            .as_ref();
    }
}

impl DocumentProvider for FsDocuments {
    fn line_count(&mut self, file: &Path) -> Option<u32> {
        let lines = self.lines(file)?;
        return u32::try_from(lines.len()).ok();
    }

    fn line_text(&mut self, file: &Path, lineno: u32) -> Option<String> {
        let lines = self.lines(file)?;
        return lines.get(lineno as usize).cloned();
    }
}

// ── Version control ───────────────────────────────────────────────────

/// The slice of a version-control client the core needs: existence checks,
/// diffs against the working tree, the head identifier, and rename
/// detection.
pub trait VcsProvider {
    /// New path of `file` if it was renamed between `revision` and now.
    fn detect_rename(&self, revision: &str, file: &Path) -> Option<PathBuf>;
    /// Unified diff of `file` between `revision` and the working tree.
    fn diff_since(&self, revision: &str, file: &Path) -> Option<String>;
    /// Identifier of the current head commit.
    fn head_revision(&self) -> Option<String>;
    /// Whether `revision` resolves to a commit.
    fn revision_exists(&self, revision: &str) -> bool;
}

/// Git provider that shells out to the `git` binary. Every failure — no
/// repository, unknown revision, missing binary — is reported as absence,
/// never as an error.
pub struct GitVcs {
    /// Working directory for git invocations.
    root: PathBuf,
}

impl GitVcs {
    /// A provider rooted at the given workspace directory.
    pub fn new(root: &Path) -> Self {
        return Self { root: root.to_path_buf() };
    }

    /// Run git with the given arguments, returning stdout on success.
    fn git(&self, args: &[&str]) -> Option<String> {
        let output = Command::new("git").current_dir(&self.root).args(args).output().ok()?;
        if !output.status.success() {
            return None;
        }
        return String::from_utf8(output.stdout).ok();
    }
}

impl VcsProvider for GitVcs {
    fn detect_rename(&self, revision: &str, file: &Path) -> Option<PathBuf> {
        let out = self.git(&["diff", "--name-status", "--find-renames", revision])?;
        let wanted = file.to_string_lossy();
        for line in out.lines() {
            let mut fields = line.split('\t');
            let status = fields.next()?;
            if !status.starts_with('R') {
                continue;
            }
            let old = fields.next()?;
            let new = fields.next()?;
            if old == wanted {
                return Some(PathBuf::from(new));
            }
        }
        return None;
    }

    fn diff_since(&self, revision: &str, file: &Path) -> Option<String> {
        let file_arg = file.to_string_lossy();
        return self.git(&["diff", revision, "--", &file_arg]);
    }

    fn head_revision(&self) -> Option<String> {
        let out = self.git(&["rev-parse", "HEAD"])?;
        let trimmed = out.trim();
        if trimmed.is_empty() {
            return None;
        }
        return Some(trimmed.to_string());
    }

    fn revision_exists(&self, revision: &str) -> bool {
        let probe = format!("{revision}^{{commit}}");
        return self.git(&["rev-parse", "--quiet", "--verify", &probe]).is_some();
    }
}

// ── Breakpoints ───────────────────────────────────────────────────────

/// The external breakpoint set the checked state mirrors.
pub trait BreakpointStore {
    /// Add a breakpoint. Adding an existing one is a no-op.
    fn add(&mut self, bp: &Breakpoint);
    /// The current set, ordered.
    fn enumerate(&self) -> BTreeSet<Breakpoint>;
    /// Remove a breakpoint. Removing an absent one is a no-op, never an error.
    fn remove(&mut self, bp: &Breakpoint);
}

/// Breakpoints persisted as a JSON list of `{file, line}` records, shared
/// with whatever debugger front end maintains the real set.
pub struct JsonBreakpoints {
    /// On-disk location of the list.
    path: PathBuf,
    /// In-memory working set; persisted explicitly via `save`.
    set: BTreeSet<Breakpoint>,
}

impl JsonBreakpoints {
    /// Load the set from disk. A missing file is an empty set.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` for read failures other than not-found,
    /// or `Error::Json` if the file is not a valid breakpoint list.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self { path: path.to_path_buf(), set: BTreeSet::new() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        let list: Vec<Breakpoint> = serde_json::from_str(&content)?;
        return Ok(Self { path: path.to_path_buf(), set: list.into_iter().collect() });
    }

    /// Write the set back to disk, ordered.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if serialization fails,
    /// or `Error::Io` if the file cannot be written.
    pub fn save(&self) -> Result<(), Error> {
        let list: Vec<&Breakpoint> = self.set.iter().collect();
        let mut content = serde_json::to_string_pretty(&list)?;
        content.push('\n');
        std::fs::write(&self.path, content)?;
        return Ok(());
    }
}

impl BreakpointStore for JsonBreakpoints {
    fn add(&mut self, bp: &Breakpoint) {
        self.set.insert(bp.clone());
    }

    fn enumerate(&self) -> BTreeSet<Breakpoint> {
        return self.set.clone();
    }

    fn remove(&mut self, bp: &Breakpoint) {
        self.set.remove(bp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removing_absent_breakpoint_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bps.json");
        let mut store = JsonBreakpoints::load(&path).unwrap();

        store.remove(&Breakpoint { file: PathBuf::from("src/a.rs"), line: 3 });
        assert!(store.enumerate().is_empty());
    }

    #[test]
    fn breakpoints_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bps.json");

        let mut store = JsonBreakpoints::load(&path).unwrap();
        store.add(&Breakpoint { file: PathBuf::from("src/a.rs"), line: 3 });
        store.add(&Breakpoint { file: PathBuf::from("src/b.rs"), line: 8 });
        store.save().unwrap();

        let reloaded = JsonBreakpoints::load(&path).unwrap();
        assert_eq!(reloaded.enumerate(), store.enumerate());
    }

    #[test]
    fn fs_documents_caches_missing_files_as_absent() {
        let mut docs = FsDocuments::new();
        assert!(docs.line_count(Path::new("/definitely/not/here.rs")).is_none());
        assert!(docs.line_text(Path::new("/definitely/not/here.rs"), 0).is_none());
    }

    #[test]
    fn fs_documents_reads_lines_by_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.rs");
        std::fs::write(&path, "one\ntwo\nthree\n").unwrap();

        let mut docs = FsDocuments::new();
        assert_eq!(docs.line_count(&path), Some(3));
        assert_eq!(docs.line_text(&path, 1).as_deref(), Some("two"));
        assert!(docs.line_text(&path, 3).is_none());
    }
}
