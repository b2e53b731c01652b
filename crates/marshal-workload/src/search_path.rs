//! Ordered, duplicate-free list of workload directories.

use std::path::{Component, Path, PathBuf};

use indexmap::IndexSet;

/// Insertion-ordered set of directories that are scanned for workloads.
///
/// Position is priority: the catalog scans front to back and a workload file
/// found in a later directory replaces a same-named one found earlier.
/// Uniqueness is by directory identity, so `./wl`, `wl/` and the absolute
/// spelling of the same directory collapse into one entry.
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    dirs: IndexSet<PathBuf>,

    /// Board-provided directory; boards without base workloads are normal
    builtin: Option<PathBuf>,
}

impl SearchPath {
    /// Create an empty search path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the search path from its four sources, in priority order:
    /// the builtin directory, the configured list, the user-supplied
    /// directory, and the parent directory of every input file.
    pub fn resolve(
        builtin: &Path,
        configured: &[PathBuf],
        user: Option<&Path>,
        inputs: &[PathBuf],
    ) -> Self {
        let mut path = Self::new();
        path.insert(builtin);
        path.builtin = Some(identity(builtin));
        for dir in configured {
            path.insert(dir);
        }
        if let Some(dir) = user {
            path.insert(dir);
        }
        for input in inputs {
            path.insert(parent_dir(input));
        }
        path
    }

    /// Append a directory unless an identical one is already present.
    ///
    /// Returns `true` when the directory was added.
    pub fn insert(&mut self, dir: impl AsRef<Path>) -> bool {
        self.dirs.insert(identity(dir.as_ref()))
    }

    /// Whether `dir` is the builtin directory, which may legitimately be
    /// absent.
    pub fn is_builtin(&self, dir: &Path) -> bool {
        self.builtin.as_deref() == Some(dir)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

impl<'a> IntoIterator for &'a SearchPath {
    type Item = &'a PathBuf;
    type IntoIter = indexmap::set::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.dirs.iter()
    }
}

/// Parent directory of an input file; a bare file name lives in `.`.
fn parent_dir(file: &Path) -> &Path {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Identity of a directory: its canonical path when it exists, otherwise
/// the lexically normalised absolute path.
fn identity(dir: &Path) -> PathBuf {
    std::fs::canonicalize(dir).unwrap_or_else(|_| absolutize(dir))
}

pub(crate) fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_each_directory_once_in_first_occurrence_order() {
        let root = TempDir::new().unwrap();
        let builtin = root.path().join("builtin");
        let shared = root.path().join("shared");
        let user = root.path().join("user");
        for dir in [&builtin, &shared, &user] {
            fs::create_dir(dir).unwrap();
        }

        let path = SearchPath::resolve(
            &builtin,
            &[shared.clone(), builtin.clone(), shared.join(".")],
            Some(&user),
            &[shared.join("a.json"), user.join("b.json"), builtin.join("c.json")],
        );

        let dirs: Vec<PathBuf> = path.iter().map(Path::to_path_buf).collect();
        assert_eq!(
            dirs,
            vec![
                fs::canonicalize(&builtin).unwrap(),
                fs::canonicalize(&shared).unwrap(),
                fs::canonicalize(&user).unwrap(),
            ]
        );
    }

    #[test]
    fn test_input_parents_appended_last() {
        let root = TempDir::new().unwrap();
        let builtin = root.path().join("builtin");
        let inputs_dir = root.path().join("mine");
        fs::create_dir(&builtin).unwrap();
        fs::create_dir(&inputs_dir).unwrap();

        let path = SearchPath::resolve(&builtin, &[], None, &[inputs_dir.join("x.json")]);

        assert_eq!(path.len(), 2);
        assert_eq!(path.iter().nth(1), Some(fs::canonicalize(&inputs_dir).unwrap().as_path()));
    }

    #[test]
    fn test_missing_directories_dedup_lexically() {
        let mut path = SearchPath::new();
        assert!(path.insert("/nonexistent/marshal/wl"));
        assert!(!path.insert("/nonexistent/marshal/./wl"));
        assert!(!path.insert("/nonexistent/marshal/other/../wl"));
        assert_eq!(path.len(), 1);
        assert!(!path.insert("/nonexistent/marshal/wl/"));
    }

    #[test]
    fn test_bare_file_name_uses_current_directory() {
        let cwd = std::env::current_dir().unwrap();
        let path = SearchPath::resolve(Path::new("/nonexistent/builtin"), &[], None, &[
            PathBuf::from("a.json"),
        ]);
        let cwd = fs::canonicalize(cwd).unwrap();
        assert!(path.iter().any(|dir| dir == cwd.as_path()));
    }

    #[test]
    fn test_empty_is_valid() {
        let path = SearchPath::new();
        assert!(path.is_empty());
        assert_eq!(path.iter().count(), 0);
    }

    #[test]
    fn test_builtin_is_remembered() {
        let path = SearchPath::resolve(
            Path::new("/nonexistent/board/base-workloads"),
            &[PathBuf::from("/nonexistent/extra")],
            None,
            &[],
        );
        assert!(path.is_builtin(Path::new("/nonexistent/board/base-workloads")));
        assert!(!path.is_builtin(Path::new("/nonexistent/extra")));
    }
}
