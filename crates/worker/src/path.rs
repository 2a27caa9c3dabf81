//! Safe resolution of a request's `bin_name` under the worker's configured
//! binary root.
//!
//! No traversal policy is imposed by the wire protocol itself, but this
//! implementation refuses to resolve outside `bin_root`: an absolute
//! `bin_name`, or one containing a `..` component, is rejected rather than
//! silently joined (which on an absolute path would discard `bin_root`
//! entirely).

use std::path::{Component, Path, PathBuf};

/// Resolve `bin_name` under `bin_root`. Returns `None` if `bin_name` would
/// escape `bin_root` (absolute path, or any `..` component).
pub fn resolve_bin_path(bin_root: &Path, bin_name: &str) -> Option<PathBuf> {
    let candidate = Path::new(bin_name);
    if candidate.is_absolute() {
        return None;
    }
    if candidate
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir))
    {
        return None;
    }
    Some(bin_root.join(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_relative_bin_name() {
        let root = Path::new("/opt/bin");
        assert_eq!(
            resolve_bin_path(root, "echo.sh"),
            Some(PathBuf::from("/opt/bin/echo.sh"))
        );
    }

    #[test]
    fn joins_relative_subdirectory() {
        let root = Path::new("/opt/bin");
        assert_eq!(
            resolve_bin_path(root, "sub/echo.sh"),
            Some(PathBuf::from("/opt/bin/sub/echo.sh"))
        );
    }

    #[test]
    fn rejects_absolute_bin_name() {
        let root = Path::new("/opt/bin");
        assert_eq!(resolve_bin_path(root, "/etc/passwd"), None);
    }

    #[test]
    fn rejects_parent_dir_traversal() {
        let root = Path::new("/opt/bin");
        assert_eq!(resolve_bin_path(root, "../../etc/passwd"), None);
        assert_eq!(resolve_bin_path(root, "sub/../../passwd"), None);
    }
}
