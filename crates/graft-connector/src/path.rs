//! Path cleaning for tree walks.

use std::ffi::OsString;

/// Split a slash-separated path into clean components.
///
/// Leading, trailing and repeated slashes are ignored, `.` is dropped and
/// `..` removes the previous component (never climbing above the root).
pub fn split_path(path: &str) -> Vec<OsString> {
    let mut parts: Vec<OsString> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(OsString::from(name)),
        }
    }
    parts
}

/// Render components back into a rooted path for log messages.
pub fn join_path(parts: &[OsString]) -> String {
    let mut out = String::new();
    for part in parts {
        out.push('/');
        out.push_str(&part.to_string_lossy());
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}
