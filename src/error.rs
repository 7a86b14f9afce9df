/// Crate-level error types for linemark diagnostics.
use std::path::PathBuf;

/// All errors in linemark carry enough context to produce a useful diagnostic
/// without a debugger. Structural failures abort the triggering operation;
/// reconciliation never errors — it degrades to pass-through instead.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A rename destination is already occupied.
    #[error("destination `{path}` already exists")]
    DestinationExists {
        /// Slash-joined tree path of the occupied destination.
        path: String,
    },

    /// A bookmark insert landed on a path where a folder already exists.
    #[error("a folder already exists at `{path}`")]
    FolderExists {
        /// Slash-joined tree path of the existing folder.
        path: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON (de)serialization failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// A path walked through a bookmark as if it were a folder.
    #[error("path prefix `{path}` is itself a bookmark, not a folder")]
    LeafNotFolder {
        /// Slash-joined tree path of the offending bookmark.
        path: String,
    },

    /// A requested line does not exist in the target file.
    #[error("no line {line} in {}", file.display())]
    LineOutOfRange {
        /// File that was read.
        file: PathBuf,
        /// One-based line number requested by the user.
        line: u32,
    },

    /// A tree path named by the user does not exist.
    #[error("no bookmark or folder at `{path}`")]
    PathNotFound {
        /// Slash-joined tree path that failed to resolve.
        path: String,
    },

    /// A rename targeted a destination inside the moved subtree.
    #[error("cannot move `{old_path}` beneath itself (`{new_path}`)")]
    RenameUnderSelf {
        /// Destination path, which the source path prefixes.
        new_path: String,
        /// Source path being moved.
        old_path: String,
    },

    /// The tree root has no parent and cannot be detached.
    #[error("cannot remove the bookmark root")]
    RootNotRemovable,

    /// The persisted store exists but holds a value of the wrong shape.
    #[error("store corrupt at `{path}`: {reason}")]
    StoreCorrupt {
        /// Slash-joined tree path of the malformed entry.
        path: String,
        /// Description of the malformed value.
        reason: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),
}
