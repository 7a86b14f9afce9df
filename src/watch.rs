//! Breakpoint-set subscription: re-derives checked states whenever the
//! shared breakpoint file changes, keeping one `CheckboxSync` alive so
//! each refresh reports a minimal change root.

use std::path::PathBuf;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};

use crate::commands;
use crate::config::Config;
use crate::error::Error;
use crate::providers::{BreakpointStore as _, JsonBreakpoints};
use crate::sync::CheckboxSync;
use crate::tree::{Payload, RecordNode};

/// Debounce delay between filesystem events and re-sync.
const DEBOUNCE_MS: u64 = 100;

/// Create a filesystem watcher that sends events on the given channel.
///
/// # Errors
///
/// Returns an error if the watcher cannot be created.
fn create_watcher(
    tx: crossbeam_channel::Sender<()>,
) -> Result<notify::RecommendedWatcher, Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_)
                    | notify::EventKind::Modify(_)
                    | notify::EventKind::Remove(_)
            )
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return Error::Io(std::io::Error::other(format!("watcher setup failed: {e}")));
    });
}

/// Entry point for the watch command.
///
/// Runs an initial sync, then watches the breakpoint file (and the store)
/// and re-derives checked states on every change.
///
/// # Errors
///
/// Returns errors from config loading, store reading, or watcher setup.
pub fn run() -> Result<(), Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let breakpoints_path = root.join(&config.breakpoints_file);

    let mut state = CheckboxSync::new();
    eprintln!("watch: initial sync");
    resync(&root, &config, &mut state)?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;
    watcher
        .watch(&root, RecursiveMode::NonRecursive)
        .map_err(|e| return Error::Io(std::io::Error::other(e.to_string())))?;

    eprintln!("watch: monitoring {}, press Ctrl+C to stop", breakpoints_path.display());

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        if let Err(e) = resync(&root, &config, &mut state) {
            eprintln!("error: {e}");
        }
    }

    return Ok(());
}

/// Reconcile bookmark positions, reload breakpoints, deliver the change
/// notification, and print the subtree to refresh. Reconciliation rewrites
/// the store only when something moved, so the watcher does not feed on its
/// own writes.
fn resync(
    root: &std::path::Path,
    config: &Config,
    state: &mut CheckboxSync,
) -> Result<(), Error> {
    let tree = commands::reconcile_store(root, config)?;
    let breakpoints = JsonBreakpoints::load(&root.join(&config.breakpoints_file))?;

    match state.on_breakpoints_changed(&tree, &breakpoints.enumerate()) {
        None => println!("No change."),
        Some(change_root) => {
            if change_root.is_empty() {
                println!("Refresh (root)");
            } else {
                println!("Refresh {change_root}");
            }
            if let Some(node) = tree.get(&change_root) {
                print_refreshed(node, &change_root, state);
            }
        },
    }
    return Ok(());
}

/// Print the refreshed subtree's leaf states.
fn print_refreshed(node: &RecordNode, path: &str, state: &CheckboxSync) {
    match &node.payload {
        Payload::Interior(children) => {
            for (label, child) in children {
                let child_path = if path.is_empty() {
                    label.clone()
                } else {
                    format!("{path}/{label}")
                };
                print_refreshed(child, &child_path, state);
            }
        },
        Payload::Leaf(_) => {
            let mark = if state.state(path) { 'x' } else { ' ' };
            println!("  [{mark}] {path}");
        },
    }
}
