//! Workload catalog keyed by file name.
//!
//! Directories of the [`SearchPath`] are scanned in order. A workload file
//! found in a later directory replaces the one with the same file name from
//! an earlier directory, so the most specific directory wins.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::search_path::absolutize;
use crate::workload::PATH_KEYS;
use crate::{deep_merge, SearchPath, WorkloadConfig, WORKLOAD_EXTENSION};

/// Errors raised while loading or resolving workloads
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("workload '{0}' not found in any workload directory")]
    NotFound(String),

    #[error("workload '{name}' inherits from unknown base '{base}'")]
    MissingBase { name: String, base: String },

    #[error("inheritance cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("workload '{name}' is invalid: {reason}")]
    Invalid { name: String, reason: String },

    #[error("failed to read workload directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A workload file as read from disk, paths already absolute.
#[derive(Debug, Clone)]
struct Entry {
    path: PathBuf,
    raw: Value,
}

/// Index of every workload file reachable from a search path.
#[derive(Debug, Clone, Default)]
pub struct ConfigCatalog {
    entries: HashMap<String, Entry>,
    image_dir: PathBuf,
    warnings: Vec<String>,
}

impl ConfigCatalog {
    /// Scan every directory of `search` in order.
    ///
    /// Unparsable files and missing directories are skipped and reported
    /// through [`ConfigCatalog::warnings`]; the caller decides whether a
    /// warning is fatal. A missing builtin directory is skipped silently.
    pub fn load(search: &SearchPath, image_dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let mut catalog = Self {
            entries: HashMap::new(),
            image_dir: image_dir.into(),
            warnings: Vec::new(),
        };

        for dir in search {
            if !dir.is_dir() {
                if search.is_builtin(dir) {
                    continue;
                }
                catalog
                    .warnings
                    .push(format!("workload directory {} does not exist", dir.display()));
                continue;
            }
            catalog.scan_dir(dir)?;
        }

        Ok(catalog)
    }

    fn scan_dir(&mut self, dir: &Path) -> Result<(), CatalogError> {
        let io_err = |source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(WORKLOAD_EXTENSION)
            })
            .collect();
        files.sort();

        for path in files {
            let Some(key) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            match read_workload(&path) {
                Ok(raw) => {
                    self.entries.insert(key, Entry { path, raw });
                }
                Err(reason) => self
                    .warnings
                    .push(format!("skipping {}: {}", path.display(), reason)),
            }
        }
        Ok(())
    }

    /// Non-fatal problems found while loading.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// File that currently provides `name`, after overrides.
    pub fn source_of(&self, name: &str) -> Option<&Path> {
        self.entries.get(&file_key(name)).map(|e| e.path.as_path())
    }

    /// Resolve a workload by file name (`a.json`; the extension may be
    /// omitted) into a fresh [`WorkloadConfig`].
    pub fn lookup(&self, name: &str) -> Result<WorkloadConfig, CatalogError> {
        let key = file_key(name);
        let mut chain = Vec::new();
        let merged = self.resolve(&key, &mut chain)?;
        let entry = &self.entries[&key];

        let workload_name = merged
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| stem(&key));

        let mut config = WorkloadConfig::from_value(&workload_name, &entry.path, merged, &self.image_dir)
            .map_err(|reason| CatalogError::Invalid {
                name: key.clone(),
                reason,
            })?;
        config.base = entry.raw.get("base").and_then(Value::as_str).map(str::to_string);
        Ok(config)
    }

    /// Merge `key` on top of its `base` chain.
    fn resolve(&self, key: &str, chain: &mut Vec<String>) -> Result<Value, CatalogError> {
        if chain.iter().any(|k| k == key) {
            chain.push(key.to_string());
            return Err(CatalogError::Cycle(chain.clone()));
        }

        let entry = match self.entries.get(key) {
            Some(entry) => entry,
            None => {
                return Err(match chain.last() {
                    Some(child) => CatalogError::MissingBase {
                        name: child.clone(),
                        base: key.to_string(),
                    },
                    None => CatalogError::NotFound(key.to_string()),
                })
            }
        };
        chain.push(key.to_string());

        let mut own = entry.raw.clone();
        let base = match own.as_object_mut().and_then(|m| m.remove("base")) {
            Some(Value::String(base)) => Some(base),
            Some(_) => {
                return Err(CatalogError::Invalid {
                    name: key.to_string(),
                    reason: "'base' must be a string".to_string(),
                })
            }
            None => None,
        };

        match base {
            Some(base) => {
                let mut parent = self.resolve(&file_key(&base), chain)?;
                // A base's identity never leaks into the derived workload.
                if let Some(map) = parent.as_object_mut() {
                    map.remove("name");
                }
                Ok(deep_merge(parent, own))
            }
            None => Ok(own),
        }
    }
}

/// Catalog key for a workload name: the file name with extension.
fn file_key(name: &str) -> String {
    let file = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name);
    if Path::new(file).extension().is_some() {
        file.to_string()
    } else {
        format!("{}.{}", file, WORKLOAD_EXTENSION)
    }
}

fn stem(key: &str) -> String {
    Path::new(key)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(key)
        .to_string()
}

/// Read a workload file and make its path-valued keys absolute.
fn read_workload(path: &Path) -> Result<Value, String> {
    let contents = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let mut value: Value = serde_json::from_str(&contents).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err("workload must be a JSON object".to_string());
    }

    let dir = absolutize(path.parent().unwrap_or_else(|| Path::new(".")));
    anchor_paths(&mut value, &dir);
    if let Some(Value::Array(jobs)) = value.get_mut("jobs") {
        for job in jobs {
            anchor_paths(job, &dir);
        }
    }
    Ok(value)
}

fn anchor_paths(value: &mut Value, dir: &Path) {
    let Some(map) = value.as_object_mut() else {
        return;
    };
    for key in PATH_KEYS {
        anchor(map.get_mut(*key), dir);
    }
    if let Some(testing) = map.get_mut("testing").and_then(Value::as_object_mut) {
        anchor(testing.get_mut("refDir"), dir);
    }
}

fn anchor(slot: Option<&mut Value>, dir: &Path) {
    if let Some(Value::String(path)) = slot {
        if Path::new(path.as_str()).is_relative() {
            *path = dir.join(path.as_str()).to_string_lossy().into_owned();
        }
    }
}
