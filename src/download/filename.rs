//! Filename sanitization and destination path derivation for downloads.
//!
//! Destinations are a pure function of the source URL so a rerun writes the
//! same archive to the same place: `<root>/<listing dir>/<file name>`.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use url::Url;

use super::constants::PARTIAL_SUFFIX;

/// Sanitizes a filename to be safe for the filesystem.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment).map_or_else(
        |e| {
            debug!(segment = %segment, error = %e, "URL decoding failed, using raw segment");
            segment.to_string()
        },
        std::borrow::Cow::into_owned,
    )
}

/// Derives the local destination for an archive URL.
///
/// The final path segment names the file; the segment before it (the listing
/// directory, e.g. `21_series`) becomes a subdirectory of `root`. Returns
/// `None` when the URL has no file name to write to.
#[must_use]
pub fn destination_for(url: &Url, root: &Path) -> Option<PathBuf> {
    let segments: Vec<&str> = url.path_segments()?.collect();
    let (file, parents) = segments.split_last()?;
    if file.is_empty() {
        return None;
    }

    let mut path = root.to_path_buf();
    if let Some(parent) = parents.last().filter(|segment| !segment.is_empty()) {
        path.push(sanitize_filename(&decode_segment(parent)));
    }
    path.push(sanitize_filename(&decode_segment(file)));
    Some(path)
}

/// Path an in-flight transfer writes to before it is renamed into place.
#[must_use]
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map_or_else(|| OsString::from("download"), ToOwned::to_owned);
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    destination.with_file_name(name)
}
