//! Work item type: one remote archive and where it lands on disk.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use url::Url;

use crate::download::destination_for;

/// One unit of download work.
///
/// Identity, ordering and equality all follow the exact source URL string,
/// so two listings linking the same archive collapse into one item.
#[derive(Debug, Clone)]
pub struct WorkItem {
    source_url: Url,
    destination: PathBuf,
    size_hint: Option<u64>,
}

impl WorkItem {
    /// Builds an item whose destination is derived from the URL under `download_root`.
    ///
    /// Returns `None` when the URL has no file name (e.g. a directory link).
    #[must_use]
    pub fn from_url(source_url: Url, download_root: &Path) -> Option<Self> {
        let destination = destination_for(&source_url, download_root)?;
        Some(Self {
            source_url,
            destination,
            size_hint: None,
        })
    }

    /// Returns a copy carrying a size hint from listing metadata.
    #[must_use]
    pub fn with_size_hint(mut self, size_hint: Option<u64>) -> Self {
        self.size_hint = size_hint;
        self
    }

    /// Source URL; also the ledger key.
    #[must_use]
    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    /// Ledger key for this item.
    #[must_use]
    pub fn key(&self) -> &str {
        self.source_url.as_str()
    }

    /// Local path the archive is written to.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Expected size, when known before the transfer starts.
    #[must_use]
    pub fn size_hint(&self) -> Option<u64> {
        self.size_hint
    }

    /// Short display name (the file name) for progress output.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.destination.file_name().map_or_else(
            || self.key().to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
    }
}

impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for WorkItem {}

impl PartialOrd for WorkItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WorkItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(other.key())
    }
}

impl std::hash::Hash for WorkItem {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(url: &str) -> WorkItem {
        WorkItem::from_url(Url::parse(url).unwrap(), Path::new("out")).unwrap()
    }

    #[test]
    fn test_item_key_is_source_url() {
        let item = item("https://example.com/21_series/21101-i00.zip");
        assert_eq!(item.key(), "https://example.com/21_series/21101-i00.zip");
        assert_eq!(
            item.destination(),
            Path::new("out/21_series/21101-i00.zip")
        );
        assert_eq!(item.display_name(), "21101-i00.zip");
        assert_eq!(item.size_hint(), None);
    }

    #[test]
    fn test_items_with_same_url_are_equal() {
        assert_eq!(
            item("https://example.com/s/b.zip"),
            item("https://example.com/s/b.zip")
        );
        assert_ne!(
            item("https://example.com/s/a.zip"),
            item("https://example.com/s/b.zip")
        );
    }

    #[test]
    fn test_items_order_by_url() {
        let mut items = vec![
            item("https://example.com/s/c.zip"),
            item("https://example.com/s/a.zip"),
        ];
        items.sort();
        assert_eq!(items[0].key(), "https://example.com/s/a.zip");
    }

    #[test]
    fn test_directory_url_is_not_an_item() {
        assert!(
            WorkItem::from_url(
                Url::parse("https://example.com/21_series/").unwrap(),
                Path::new("out")
            )
            .is_none()
        );
    }

    #[test]
    fn test_size_hint_is_carried() {
        let item = item("https://example.com/s/a.zip").with_size_hint(Some(42));
        assert_eq!(item.size_hint(), Some(42));
    }
}
