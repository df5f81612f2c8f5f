use std::path::{Component, Path, PathBuf};

use super::errors::StageError;

/// Refuse staging roots that a reset would make catastrophic.
///
/// The root is wiped on every run, so it must not be the filesystem root,
/// the home directory, the working directory (or one of its ancestors), or a
/// directory that holds one of the artifacts about to be copied.
pub fn check_root<'a, I>(root: &Path, sources: I) -> Result<(), StageError>
where
    I: IntoIterator<Item = &'a Path>,
{
    let resolved = resolve(root);
    let refuse = |reason: String| StageError::UnsafeRoot {
        root: root.to_path_buf(),
        reason,
    };

    if resolved.parent().is_none() {
        return Err(refuse("it is the filesystem root".into()));
    }

    if let Some(home) = dirs::home_dir() {
        if resolve(&home) == resolved {
            return Err(refuse("it is the home directory".into()));
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if resolve(&cwd).starts_with(&resolved) {
            return Err(refuse("it contains the current working directory".into()));
        }
    }

    for source in sources {
        if resolve(source).starts_with(&resolved) {
            return Err(refuse(format!(
                "it contains source artifact '{}'",
                source.display()
            )));
        }
    }

    Ok(())
}

/// Best-effort absolute form of a path: canonical when it exists,
/// otherwise the lexically normalized absolute path.
pub fn resolve(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    // Canonicalize the deepest existing ancestor so symlinked prefixes compare equal
    let mut normalized = normalize(&absolute);
    let mut tail = Vec::new();
    while !normalized.exists() {
        match (normalized.file_name(), normalized.parent()) {
            (Some(name), Some(parent)) => {
                tail.push(name.to_os_string());
                normalized = parent.to_path_buf();
            }
            _ => break,
        }
    }
    let mut base = normalized.canonicalize().unwrap_or(normalized);
    for name in tail.into_iter().rev() {
        base.push(name);
    }
    base
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
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

    #[test]
    fn test_filesystem_root_refused() {
        let err = check_root(Path::new("/"), std::iter::empty()).unwrap_err();
        assert!(matches!(err, StageError::UnsafeRoot { .. }));
    }

    #[test]
    fn test_home_refused() {
        if let Some(home) = dirs::home_dir() {
            assert!(check_root(&home, std::iter::empty()).is_err());
        }
    }

    #[test]
    fn test_cwd_and_ancestors_refused() {
        let cwd = std::env::current_dir().unwrap();
        assert!(check_root(&cwd, std::iter::empty()).is_err());
        if let Some(parent) = cwd.parent() {
            assert!(check_root(parent, std::iter::empty()).is_err());
        }
    }

    #[test]
    fn test_root_holding_a_source_refused() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("out").join("app.exe");
        let err = check_root(tmp.path(), [source.as_path()]).unwrap_err();
        assert!(err.to_string().contains("app.exe"));
    }

    #[test]
    fn test_sibling_of_sources_allowed() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().join("Socket_build");
        let source = tmp.path().join("bin").join("app.exe");
        assert!(check_root(&root, [source.as_path()]).is_ok());
    }

    #[test]
    fn test_resolve_collapses_dot_segments() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dotted = tmp.path().join("a").join("..").join("b");
        assert_eq!(resolve(&dotted), resolve(&tmp.path().join("b")));
    }
}
