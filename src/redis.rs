use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::store::{Error, KvStore, ListOptions, ListPage, Result};

/// Redis backs the store contract directly: `GET`/`SET`/`DEL` for the
/// point operations and `SCAN` for the cursor listing. `SCAN`'s COUNT is
/// a hint, so a page may carry more or fewer keys than asked for; callers
/// only rely on the cursor chain, which visits every live key.
#[async_trait::async_trait]
impl KvStore for ConnectionManager {
    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = AsyncCommands::get(self, key).await.map_err(store_err)?;
        Ok(value)
    }

    async fn put(&mut self, key: &str, value: &str) -> Result<()> {
        let response: std::result::Result<(), _> = self.set(key, value).await;
        response.map_err(store_err)
    }

    async fn delete(&mut self, key: &str) -> Result<()> {
        let response: std::result::Result<(), _> = self.del(key).await;
        response.map_err(store_err)
    }

    async fn list(&mut self, opts: ListOptions) -> Result<ListPage> {
        let cursor: u64 = match opts.cursor.as_deref() {
            None => 0,
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Store(format!("invalid scan cursor: {raw}")))?,
        };

        let mut cmd = redis::cmd("SCAN");
        cmd.arg(cursor);
        if let Some(prefix) = &opts.prefix {
            cmd.arg("MATCH").arg(format!("{}*", escape_glob(prefix)));
        }
        if opts.limit > 0 {
            cmd.arg("COUNT").arg(opts.limit);
        }

        let (next, keys): (u64, Vec<String>) =
            cmd.query_async(self).await.map_err(store_err)?;

        Ok(ListPage {
            keys,
            cursor: (next != 0).then(|| next.to_string()),
            complete: next == 0,
        })
    }
}

fn store_err(err: redis::RedisError) -> Error {
    Error::Store(err.to_string())
}

/// Escape glob metacharacters so a prefix only ever matches literally.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '^' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
