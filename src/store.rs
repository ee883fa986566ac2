use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Error>;

/// Error surface of the counter and browser operations.
///
/// Decode failures never show up here: the codec and the browser absorb
/// them per segment and degrade to the raw key.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing required input: {0}")]
    MissingInput(&'static str),

    #[error("store operation failed: {0}")]
    Store(String),
}

/// Options for one page of a key listing.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Upper bound on keys per page. Backends may treat this as a hint.
    pub limit: usize,
    /// Continuation token from a previous page, opaque to the caller.
    pub cursor: Option<String>,
    /// Only keys starting with this prefix.
    pub prefix: Option<String>,
}

/// One page of keys plus the continuation state.
#[derive(Debug, Clone)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub cursor: Option<String>,
    pub complete: bool,
}

/// The key-value store every component talks to.
///
/// The store offers no transactions and no atomic increment, only these
/// four calls. Implementations are cheap to clone so that independent
/// operations of one request can run concurrently, and every call is a
/// single attempt with no retry.
#[async_trait]
pub trait KvStore: Send + Sync + Clone {
    async fn get(&mut self, key: &str) -> Result<Option<String>>;
    async fn put(&mut self, key: &str, value: &str) -> Result<()>;
    async fn delete(&mut self, key: &str) -> Result<()>;
    async fn list(&mut self, opts: ListOptions) -> Result<ListPage>;
}
