use futures::future::join_all;

use crate::pagekey::KeyCodec;
use crate::store::{Error, KvStore, ListOptions, Result};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_LIMIT: usize = 20;
/// Ceiling when only key names are returned.
pub const KEYS_ONLY_CEILING: usize = 256;
/// Ceiling when values are fetched too, to keep the per-request latency
/// of the value fan-out bounded.
pub const WITH_VALUES_CEILING: usize = 30;

/// Options for one page of the administrative listing.
#[derive(Debug, Clone, Default)]
pub struct BrowseOptions {
    pub limit: Option<usize>,
    pub cursor: Option<String>,
    pub prefix: Option<String>,
}

/// A page of bare key names.
#[derive(Debug, Clone)]
pub struct KeyPage {
    pub keys: Vec<String>,
    pub cursor: Option<String>,
    pub complete: bool,
}

/// A listed key with its value and decoded display path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    /// `None` when the key vanished or its fetch failed.
    pub value: Option<String>,
    /// Best-effort decode of the key; falls back to the raw key.
    pub path: String,
}

/// A page of resolved entries.
#[derive(Debug, Clone)]
pub struct EntryPage {
    pub entries: Vec<Entry>,
    pub cursor: Option<String>,
    pub complete: bool,
}

/// Pages through the stored keys for the admin dashboard.
#[derive(Debug, Clone)]
pub struct KeyBrowser<S> {
    store: S,
    codec: KeyCodec,
}

impl<S: KvStore> KeyBrowser<S> {
    pub fn new(store: S, codec: KeyCodec) -> Self {
        Self { store, codec }
    }

    /// One page of key names, no per-key reads. This is the fast path the
    /// dashboard uses to count keys, so it allows the larger page size.
    pub async fn list_keys(&self, opts: &BrowseOptions) -> Result<KeyPage> {
        let page = self
            .store
            .clone()
            .list(list_options(opts, KEYS_ONLY_CEILING))
            .await?;

        Ok(KeyPage {
            keys: page.keys,
            cursor: page.cursor,
            complete: page.complete,
        })
    }

    /// One page of keys with their values, fetched concurrently. A failed
    /// fetch leaves a hole in that entry, never fails the page; key order
    /// of the underlying listing is preserved.
    pub async fn list_entries(&self, opts: &BrowseOptions) -> Result<EntryPage> {
        let page = self
            .store
            .clone()
            .list(list_options(opts, WITH_VALUES_CEILING))
            .await?;

        let codec = self.codec;
        let fetches = page.keys.into_iter().map(|key| {
            let mut store = self.store.clone();
            async move {
                let value = match store.get(&key).await {
                    Ok(value) => value,
                    Err(err) => {
                        tracing::warn!("fail to fetch value of `{key}`: {err}");
                        None
                    }
                };
                Entry {
                    path: codec.decode(&key),
                    key,
                    value,
                }
            }
        });
        let entries = join_all(fetches).await;

        Ok(EntryPage {
            entries,
            cursor: page.cursor,
            complete: page.complete,
        })
    }

    pub async fn update_entry(&self, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::MissingInput("key"));
        }
        self.store.clone().put(key, value).await
    }

    pub async fn delete_entry(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::MissingInput("key"));
        }
        self.store.clone().delete(key).await
    }
}

/// A requested limit is honored between 1 and [`KEYS_ONLY_CEILING`],
/// anything else falls back to [`DEFAULT_LIMIT`], and the mode's ceiling
/// is applied last.
fn effective_limit(requested: Option<usize>, ceiling: usize) -> usize {
    requested
        .filter(|limit| (1..=KEYS_ONLY_CEILING).contains(limit))
        .unwrap_or(DEFAULT_LIMIT)
        .min(ceiling)
}

fn list_options(opts: &BrowseOptions, ceiling: usize) -> ListOptions {
    ListOptions {
        limit: effective_limit(opts.limit, ceiling),
        cursor: opts.cursor.clone(),
        prefix: opts.prefix.clone(),
    }
}
