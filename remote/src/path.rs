//! Remote (POSIX, `/`-separated) path helpers.
//!
//! SFTP paths are plain strings interpreted by the server, so these helpers operate lexically and
//! never consult the local filesystem.

/// Join a file name onto a remote directory.
#[must_use]
pub fn join(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

#[must_use]
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

/// Lexically normalize a remote path: drop empty and `.` segments, resolve `..`.
///
/// `..` never climbs above the root of an absolute path; leading `..` of a relative path is kept.
#[must_use]
pub fn normalize(path: &str) -> String {
    let absolute = is_absolute(path);
    let mut segments: Vec<&str> = vec![];
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&"..") | None if !absolute => segments.push(".."),
                Some(_) => {
                    segments.pop();
                }
                None => {}
            },
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Resolve `path` against `base` (typically the remote login directory) and normalize it.
#[must_use]
pub fn absolutize(base: &str, path: &str) -> String {
    if is_absolute(path) {
        normalize(path)
    } else {
        normalize(&join(base, path))
    }
}
