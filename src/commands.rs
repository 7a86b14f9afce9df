//! CLI command bodies: add, list, remove, rename, check, toggle, sync.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::Config;
use crate::error::Error;
use crate::persist;
use crate::providers::{
    BreakpointStore as _, DocumentProvider as _, FsDocuments, GitVcs, JsonBreakpoints,
    VcsProvider as _,
};
use crate::reconcile::{Outcome, Reconciler};
use crate::sync::CheckboxSync;
use crate::tree::{Payload, RecordNode, RecordTree};
use crate::types::LocationFact;

/// Capture the line at `file:line` (1-based) as a bookmark at `tree_path`,
/// synthesizing missing folders.
///
/// # Errors
///
/// Returns `Error::LineOutOfRange` if the line doesn't exist, structural
/// errors from the insert, or persistence errors.
pub fn add(tree_path: &str, file: &str, line: u32) -> Result<(), Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;

    let stored = config.path_style.encode(&root, Path::new(file));
    let disk = config.path_style.resolve(&root, &stored);

    let lineno = line
        .checked_sub(1)
        .ok_or(Error::LineOutOfRange { file: disk.clone(), line })?;
    let mut docs = FsDocuments::new();
    let content = docs
        .line_text(&disk, lineno)
        .ok_or(Error::LineOutOfRange { file: disk.clone(), line })?;

    let fact = LocationFact {
        content,
        deleted: false,
        file: stored,
        lineno,
        revision: GitVcs::new(&root).head_revision(),
    };

    let store_path = root.join(&config.store_file);
    let mut tree = persist::read(&store_path)?;
    tree.insert(tree_path, fact)?;
    persist::write(&tree, &store_path)?;

    println!("Added {tree_path} -> {file}:{line}");
    return Ok(());
}

/// Reconcile every bookmark against the current working tree, report
/// movement, and persist the re-anchored facts.
///
/// # Errors
///
/// Returns errors from store reading or writing.
pub fn check() -> Result<ExitCode, Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let store_path = root.join(&config.store_file);

    let mut tree = persist::read(&store_path)?;
    let mut docs = FsDocuments::new();
    let vcs = GitVcs::new(&root);
    let mut pass =
        Reconciler::new(&mut docs, &vcs, &root, config.path_style, config.search_radius);
    let outcomes = pass.reconcile_all(&mut tree);

    let mut stale_count = 0_u32;
    let mut broken_count = 0_u32;
    let mut moved_count = 0_u32;
    for (path, outcome) in &outcomes {
        match outcome {
            Outcome::Broken(reason) => {
                broken_count = broken_count.saturating_add(1);
                println!("BROKEN  {path} ({reason})");
            },
            Outcome::Fresh => {},
            Outcome::Moved { from, to } => {
                moved_count = moved_count.saturating_add(1);
                let from_display = from.saturating_add(1);
                let to_display = to.saturating_add(1);
                println!("MOVED   {path}  line {from_display} -> {to_display}");
            },
            Outcome::Stale => {
                stale_count = stale_count.saturating_add(1);
                println!("STALE   {path}");
            },
        }
    }

    persist::write(&tree, &store_path)?;

    // Exit code priority: broken (2) > stale (1) > fresh/moved (0).
    let total = outcomes.len();
    if broken_count > 0 {
        println!();
        println!("{broken_count} broken, {stale_count} stale, {moved_count} moved");
        return Ok(ExitCode::from(2));
    } else if stale_count > 0 {
        println!();
        println!("{stale_count} stale, {moved_count} moved");
        return Ok(ExitCode::from(1));
    } else if moved_count > 0 {
        println!("{moved_count} moved, {total} bookmarks tracked");
        return Ok(ExitCode::SUCCESS);
    } else {
        println!("All {total} bookmarks fresh");
        return Ok(ExitCode::SUCCESS);
    }
}

/// Print the tree with derived checked marks.
///
/// # Errors
///
/// Returns errors from store or breakpoint loading.
pub fn list() -> Result<(), Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;

    let tree = persist::read(&root.join(&config.store_file))?;
    let breakpoints = JsonBreakpoints::load(&root.join(&config.breakpoints_file))?;
    let mut sync = CheckboxSync::new();
    sync.recompute(&tree, &breakpoints.enumerate());

    if matches!(&tree.root.payload, Payload::Interior(c) if c.is_empty()) {
        println!("No bookmarks.");
        return Ok(());
    }

    print_subtree(&tree.root, "", 0, &sync);
    return Ok(());
}

/// Reconcile every bookmark and persist any re-anchoring, so checked-state
/// derivation sees current positions rather than wherever the last `check`
/// left them. The store is rewritten only when a fact actually changed; an
/// unchanged pass generates no filesystem event.
///
/// # Errors
///
/// Returns errors from store reading or writing.
pub fn reconcile_store(root: &Path, config: &Config) -> Result<RecordTree, Error> {
    let store_path = root.join(&config.store_file);
    let mut tree = persist::read(&store_path)?;
    let before = persist::serialize(&tree)?;

    let mut docs = FsDocuments::new();
    let vcs = GitVcs::new(root);
    let mut pass =
        Reconciler::new(&mut docs, &vcs, root, config.path_style, config.search_radius);
    pass.reconcile_all(&mut tree);

    if persist::serialize(&tree)? != before {
        persist::write(&tree, &store_path)?;
    }
    return Ok(tree);
}

/// Remove the bookmark or folder at `path`, subtree included.
///
/// # Errors
///
/// Returns structural errors from the removal, or persistence errors.
pub fn remove(path: &str) -> Result<(), Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let store_path = root.join(&config.store_file);

    let mut tree = persist::read(&store_path)?;
    tree.remove(path)?;
    persist::write(&tree, &store_path)?;

    println!("Removed {path}");
    return Ok(());
}

/// Move a bookmark or folder to a new path.
///
/// # Errors
///
/// Returns structural errors from the move, or persistence errors.
pub fn rename(old: &str, new: &str) -> Result<(), Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let store_path = root.join(&config.store_file);

    let mut tree = persist::read(&store_path)?;
    tree.rename(old, new)?;
    persist::write(&tree, &store_path)?;

    println!("Renamed {old} -> {new}");
    return Ok(());
}

/// Downward pass: reconcile bookmark positions, recompute checked states
/// from the breakpoint set, and report the subtree that needs refreshing.
///
/// # Errors
///
/// Returns errors from store or breakpoint loading.
pub fn sync() -> Result<(), Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;

    let tree = reconcile_store(&root, &config)?;
    let breakpoints = JsonBreakpoints::load(&root.join(&config.breakpoints_file))?;
    let mut state = CheckboxSync::new();
    let change_root = state.recompute(&tree, &breakpoints.enumerate());

    print_subtree(&tree.root, "", 0, &state);
    print_change_root(change_root.as_deref());
    return Ok(());
}

/// Flip the checked state of the node at `path`, pushing the change into
/// the breakpoint set. A folder toggle drives all bookmarks below it to
/// one uniform state. Positions are reconciled first, so the breakpoints
/// written land on the lines as they sit in the file right now.
///
/// # Errors
///
/// Returns `Error::PathNotFound` if `path` does not resolve, or
/// persistence errors.
pub fn toggle(path: &str) -> Result<(), Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;

    let tree = reconcile_store(&root, &config)?;
    let mut breakpoints = JsonBreakpoints::load(&root.join(&config.breakpoints_file))?;

    let mut state = CheckboxSync::new();
    state.recompute(&tree, &breakpoints.enumerate());
    let change_root = state.toggle(&tree, path, &mut breakpoints)?;
    breakpoints.save()?;

    print_change_root(change_root.as_deref());
    return Ok(());
}

/// One line naming the subtree a presentation layer would redraw.
fn print_change_root(change_root: Option<&str>) {
    match change_root {
        None => println!("No change."),
        Some("") => println!("Refresh (root)"),
        Some(path) => println!("Refresh {path}"),
    }
}

/// Recursive checked-state listing, two spaces per level, folders first
/// by virtue of label order within each folder.
fn print_subtree(node: &RecordNode, path: &str, depth: usize, state: &CheckboxSync) {
    let Payload::Interior(children) = &node.payload else {
        return;
    };
    for (label, child) in children {
        let child_path = if path.is_empty() {
            label.clone()
        } else {
            format!("{path}/{label}")
        };
        let mark = if state.state(&child_path) { 'x' } else { ' ' };
        let indent = "  ".repeat(depth);
        match &child.payload {
            Payload::Interior(_) => {
                println!("{indent}[{mark}] {label}/");
                print_subtree(child, &child_path, depth.saturating_add(1), state);
            },
            Payload::Leaf(fact) => {
                let line = fact.lineno.saturating_add(1);
                let flag = if fact.deleted { "  (stale)" } else { "" };
                println!("{indent}[{mark}] {label}  {}:{line}{flag}", fact.file.display());
            },
        }
    }
}
