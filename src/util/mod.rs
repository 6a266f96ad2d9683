use std::path::{Component, Path, PathBuf};

/// Lexically resolves `.` and `..` components, without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Joins a relative `path` onto `base`'s directory. Absolute paths are only normalized.
pub fn make_absolute(base: Option<&Path>, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize_path(path);
    }

    let directory = match base {
        Some(base) => base.parent().map(Path::to_path_buf).unwrap_or_default(),
        None => std::env::current_dir().unwrap_or_default(),
    };
    normalize_path(&directory.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dot_segments() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c.dae")), PathBuf::from("/a/c.dae"));
    }

    #[test]
    fn relative_paths_join_the_base_directory() {
        let base = Path::new("/scenes/main.dae");
        assert_eq!(make_absolute(Some(base), Path::new("props/box.dae")), PathBuf::from("/scenes/props/box.dae"));
        assert_eq!(make_absolute(Some(base), Path::new("../lib.dae")), PathBuf::from("/lib.dae"));
        assert_eq!(make_absolute(Some(base), Path::new("/abs/x.dae")), PathBuf::from("/abs/x.dae"));
    }
}
