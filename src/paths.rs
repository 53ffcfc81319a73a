// src/paths.rs
//
//! Path <-> key mapping.
//!
//! The store has no directories, only keys. Every filesystem path maps to
//! exactly one object key under the configured root prefix; directory paths
//! additionally map to a folder-marker key (the object key plus a trailing
//! separator). Mapping is pure string work with no failure modes.

use crate::constants::{FOLDER_SUFFIX, PATH_SEPARATOR};

/// Deterministic, reversible path/key mapper for one adapter instance.
#[derive(Debug, Clone)]
pub struct KeyMapper {
    root_prefix: String,
}

impl KeyMapper {
    /// `root_prefix` is the key prefix the filesystem root maps to, without
    /// leading or trailing separators ("" for the whole bucket).
    pub fn new(root_prefix: &str) -> Self {
        Self {
            root_prefix: normalize(root_prefix),
        }
    }

    /// Key of the filesystem root. May be empty; an empty prefix means
    /// "all objects" to the store and must never be turned into a literal
    /// separator.
    pub fn root_key(&self) -> &str {
        &self.root_prefix
    }

    /// True when `path` denotes the filesystem root.
    pub fn is_root(&self, path: &str) -> bool {
        normalize(path).is_empty()
    }

    /// Object key for a file path: separators collapsed, root prefix
    /// prepended. The root maps to the (possibly empty) root key.
    pub fn to_key(&self, path: &str) -> String {
        let rel = normalize(path);
        join_key(&self.root_prefix, &rel)
    }

    /// Folder-marker key for a directory path: the object key plus the
    /// folder suffix. The root is left as-is so listings see an empty
    /// prefix, not a lone separator.
    pub fn to_folder_key(&self, path: &str) -> String {
        let key = self.to_key(path);
        if key.is_empty() {
            return key;
        }
        format!("{key}{FOLDER_SUFFIX}")
    }

    /// Listing prefix for a directory path. Same as the folder key; empty
    /// for the root.
    pub fn to_list_prefix(&self, path: &str) -> String {
        self.to_folder_key(path)
    }

    /// Inverse of `to_key` for keys produced by this mapper: strips the root
    /// prefix and any folder suffix, yielding an absolute path. The prefix is
    /// only removed at a segment boundary, so `data` never strips from
    /// `database/x`.
    pub fn to_path(&self, key: &str) -> String {
        let mut rel = key;
        if !self.root_prefix.is_empty() {
            if rel == self.root_prefix {
                rel = "";
            } else if let Some(stripped) = rel
                .strip_prefix(&self.root_prefix)
                .and_then(|r| r.strip_prefix(PATH_SEPARATOR))
            {
                rel = stripped;
            }
        }
        let rel = rel.trim_matches('/');
        format!("{PATH_SEPARATOR}{rel}")
    }
}

/// Collapse repeated separators and trim leading/trailing ones.
fn normalize(path: &str) -> String {
    path.split(PATH_SEPARATOR)
        .filter(|seg| !seg.is_empty())
        .collect::<Vec<_>>()
        .join(PATH_SEPARATOR)
}

fn join_key(prefix: &str, rel: &str) -> String {
    match (prefix.is_empty(), rel.is_empty()) {
        (true, _) => rel.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}{PATH_SEPARATOR}{rel}"),
    }
}
