use crate::pagekey::KeyCodec;
use crate::store::{KvStore, Result};

/// Key holding the aggregate view count across all pages. Encoded page
/// keys always start with `_` or are the literal `root`, so this can
/// never collide with one.
pub const SITE_TOTAL_KEY: &str = "site_total_pv";

/// Totals reported back after a recorded visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitTotals {
    pub site: u64,
    pub page: u64,
}

/// Records page views with a read-increment-write cycle per counter.
#[derive(Debug, Clone)]
pub struct VisitCounter<S> {
    store: S,
    codec: KeyCodec,
}

impl<S: KvStore> VisitCounter<S> {
    pub fn new(store: S, codec: KeyCodec) -> Self {
        Self { store, codec }
    }

    /// Count one visit to `path` against both the page counter and the
    /// site total.
    ///
    /// The two reads run concurrently, then the two writes; the call only
    /// returns once both writes are acknowledged, and any failed store
    /// call fails the whole operation with no retry. An empty path counts
    /// against the `root` page.
    ///
    /// The store has no compare-and-swap, so two visits to the same page
    /// can both read the same old value and each write old+1, losing one
    /// increment. Approximate counting is the accepted trade-off here.
    pub async fn record_visit(&self, path: &str) -> Result<VisitTotals> {
        let page_key = self.codec.encode(path);

        let mut site_reader = self.store.clone();
        let mut page_reader = self.store.clone();
        let (site_raw, page_raw) = tokio::try_join!(
            site_reader.get(SITE_TOTAL_KEY),
            page_reader.get(&page_key),
        )?;

        let totals = VisitTotals {
            site: parse_count(site_raw) + 1,
            page: parse_count(page_raw) + 1,
        };

        let mut site_writer = self.store.clone();
        let mut page_writer = self.store.clone();
        let site_value = totals.site.to_string();
        let page_value = totals.page.to_string();
        tokio::try_join!(
            site_writer.put(SITE_TOTAL_KEY, &site_value),
            page_writer.put(&page_key, &page_value),
        )?;

        Ok(totals)
    }
}

/// An absent key or a value that does not parse as a non-negative integer
/// counts as zero, never as an error.
fn parse_count(raw: Option<String>) -> u64 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Error;
    use crate::testkit::MemStore;

    fn counter(store: &MemStore) -> VisitCounter<MemStore> {
        VisitCounter::new(store.clone(), KeyCodec::new())
    }

    #[tokio::test]
    async fn counts_from_empty_store() {
        let store = MemStore::new();
        let counter = counter(&store);

        let first = counter.record_visit("/x").await.unwrap();
        assert_eq!(first, VisitTotals { site: 1, page: 1 });

        let second = counter.record_visit("/x").await.unwrap();
        assert_eq!(second, VisitTotals { site: 2, page: 2 });

        assert_eq!(store.value_of(SITE_TOTAL_KEY), Some("2".into()));
        assert_eq!(store.value_of("_x"), Some("2".into()));
    }

    #[tokio::test]
    async fn separate_pages_share_the_site_total() {
        let store = MemStore::new();
        let counter = counter(&store);

        counter.record_visit("/a").await.unwrap();
        let totals = counter.record_visit("/b").await.unwrap();

        assert_eq!(totals, VisitTotals { site: 2, page: 1 });
    }

    #[tokio::test]
    async fn garbage_values_count_as_zero() {
        let store = MemStore::new();
        store.seed(SITE_TOTAL_KEY, "5");
        store.seed("_x", "abc");
        let counter = counter(&store);

        let totals = counter.record_visit("/x").await.unwrap();
        assert_eq!(totals, VisitTotals { site: 6, page: 1 });
    }

    #[tokio::test]
    async fn negative_and_fractional_values_count_as_zero() {
        let store = MemStore::new();
        store.seed("_x", "-3");
        store.seed(SITE_TOTAL_KEY, "1.5");
        let counter = counter(&store);

        let totals = counter.record_visit("/x").await.unwrap();
        assert_eq!(totals, VisitTotals { site: 1, page: 1 });
    }

    #[tokio::test]
    async fn empty_path_counts_the_root_page() {
        let store = MemStore::new();
        let counter = counter(&store);

        counter.record_visit("").await.unwrap();
        assert_eq!(store.value_of("root"), Some("1".into()));
    }

    #[tokio::test]
    async fn read_failure_fails_the_visit_without_writing() {
        let store = MemStore::new();
        store.fail_get_on(SITE_TOTAL_KEY);
        let counter = counter(&store);

        let err = counter.record_visit("/x").await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn write_failure_fails_the_visit() {
        let store = MemStore::new();
        store.fail_put_on("_x");
        let counter = counter(&store);

        let err = counter.record_visit("/x").await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[tokio::test]
    async fn overlapping_read_windows_lose_one_increment() {
        // Hold every read until all four (two visits, two counters each)
        // have started, forcing both visits to observe the same zeros.
        let store = MemStore::with_read_gate(4);
        let a = counter(&store);
        let b = counter(&store);

        let (ra, rb) = tokio::join!(a.record_visit("/x"), b.record_visit("/x"));
        let (ra, rb) = (ra.unwrap(), rb.unwrap());

        // Both visits report the same totals and one increment is lost.
        assert_eq!(ra, VisitTotals { site: 1, page: 1 });
        assert_eq!(rb, VisitTotals { site: 1, page: 1 });
        assert_eq!(store.value_of(SITE_TOTAL_KEY), Some("1".into()));
        assert_eq!(store.value_of("_x"), Some("1".into()));
    }
}
