//! Repository-relative path helpers
//!
//! Paths handled by the orchestrator are POSIX-style strings relative to the
//! checkout root. The root directory itself is the empty string.

/// Parent directory of a repository-relative path
pub fn parent_dir(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    }
}

/// Join a directory and a relative path
pub fn join(dir: &str, path: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let path = path.strip_prefix("./").unwrap_or(path);
    if dir.is_empty() || dir == "." {
        path.to_string()
    } else {
        format!("{}/{}", dir, path)
    }
}

/// Path of a file living next to `path`
pub fn sibling(path: &str, file_name: &str) -> String {
    join(parent_dir(path), file_name)
}
