//! Store persistence: the bookmark tree as a nested JSON association,
//! with read/parse/serialize/write mirroring how the tree is used.
//!
//! Each key is a path segment; each value is either a location record
//! (recognized by its field set) or another association. Anything else is
//! a format error — malformed entries are rejected with their path, never
//! silently dropped.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::Error;
use crate::tree::{Payload, RecordNode, RecordTree};
use crate::types::LocationFact;

/// Fields that mark a JSON object as a location record rather than a folder.
const FACT_FIELDS: [&str; 3] = ["content", "file", "lineno"];

/// Parse a store from JSON text.
///
/// # Errors
///
/// Returns `Error::Json` if the text is not valid JSON,
/// or `Error::StoreCorrupt` for a valid-JSON value of the wrong shape.
pub fn parse(content: &str) -> Result<RecordTree, Error> {
    if content.trim().is_empty() {
        return Ok(RecordTree::new());
    }
    let value: Value = serde_json::from_str(content)?;
    return tree_from_value(&value);
}

/// Read and parse a store from disk. A missing file is an empty store.
///
/// # Errors
///
/// Returns `Error::Io` for read failures other than not-found,
/// plus the errors of `parse`.
pub fn read(path: &Path) -> Result<RecordTree, Error> {
    let content = match std::fs::read_to_string(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(RecordTree::new()),
        Err(e) => return Err(Error::Io(e)),
        Ok(c) => c,
    };
    return parse(&content);
}

/// Serialize a tree to pretty JSON. The top-level object is the root's
/// children; the unlabeled root itself is not persisted.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails.
pub fn serialize(tree: &RecordTree) -> Result<String, Error> {
    let value = node_to_value(&tree.root)?;
    let mut out = serde_json::to_string_pretty(&value)?;
    out.push('\n');
    return Ok(out);
}

/// Write the store to disk.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails,
/// or `Error::Io` if the file cannot be written.
pub fn write(tree: &RecordTree, path: &Path) -> Result<(), Error> {
    let content = serialize(tree)?;
    std::fs::write(path, content)?;
    return Ok(());
}

/// Convert one node to its persisted value.
fn node_to_value(node: &RecordNode) -> Result<Value, Error> {
    return match &node.payload {
        Payload::Interior(children) => {
            let mut map = Map::new();
            for (label, child) in children {
                map.insert(label.clone(), node_to_value(child)?);
            }
            Ok(Value::Object(map))
        },
        Payload::Leaf(fact) => Ok(serde_json::to_value(fact)?),
    };
}

/// Rebuild a tree from the persisted top-level association.
fn tree_from_value(value: &Value) -> Result<RecordTree, Error> {
    let Value::Object(entries) = value else {
        return Err(Error::StoreCorrupt {
            path: String::new(),
            reason: format!("expected an object at the top level, got {}", shape_name(value)),
        });
    };

    let mut children = BTreeMap::new();
    for (label, child) in entries {
        children.insert(label.clone(), node_from_value(label, child, label)?);
    }
    let mut tree = RecordTree::new();
    tree.root.payload = Payload::Interior(children);
    return Ok(tree);
}

/// Classify one persisted value by shape: the location-record field set
/// makes a bookmark, any other object makes a folder, anything else is
/// a format error.
fn node_from_value(label: &str, value: &Value, path: &str) -> Result<RecordNode, Error> {
    let Value::Object(entries) = value else {
        return Err(Error::StoreCorrupt {
            path: path.to_string(),
            reason: format!("expected an object, got {}", shape_name(value)),
        });
    };

    if FACT_FIELDS.iter().all(|f| return entries.contains_key(*f)) {
        let fact: LocationFact =
            serde_json::from_value(value.clone()).map_err(|e| return Error::StoreCorrupt {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        return Ok(RecordNode::bookmark(label, fact));
    }

    let mut children = BTreeMap::new();
    for (child_label, child_value) in entries {
        let child_path = format!("{path}/{child_label}");
        children.insert(
            child_label.clone(),
            node_from_value(child_label, child_value, &child_path)?,
        );
    }
    let mut node = RecordNode::folder(label);
    node.payload = Payload::Interior(children);
    return Ok(node);
}

/// Human name for a JSON value's shape, for corruption messages.
fn shape_name(value: &Value) -> &'static str {
    return match value {
        Value::Array(_) => "an array",
        Value::Bool(_) => "a boolean",
        Value::Null => "null",
        Value::Number(_) => "a number",
        Value::Object(_) => "an object",
        Value::String(_) => "a string",
    };
}
