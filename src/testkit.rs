//! In-memory store double for component tests. Counts accesses, injects
//! failures per key, and can hold reads on a barrier to force the
//! interleavings the real store only produces under load.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Barrier;

use crate::store::{Error, KvStore, ListOptions, ListPage, Result};

#[derive(Clone, Default)]
pub(crate) struct MemStore {
    data: Arc<Mutex<HashMap<String, String>>>,
    gets: Arc<AtomicUsize>,
    puts: Arc<AtomicUsize>,
    failing_gets: Arc<Mutex<HashSet<String>>>,
    failing_puts: Arc<Mutex<HashSet<String>>>,
    failing_list: Arc<AtomicBool>,
    read_gate: Option<Arc<Barrier>>,
}

impl MemStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A store whose reads all block until `readers` of them have started.
    pub(crate) fn with_read_gate(readers: usize) -> Self {
        Self {
            read_gate: Some(Arc::new(Barrier::new(readers))),
            ..Self::default()
        }
    }

    pub(crate) fn seed(&self, key: &str, value: &str) {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub(crate) fn value_of(&self, key: &str) -> Option<String> {
        self.data.lock().unwrap().get(key).cloned()
    }

    pub(crate) fn fail_get_on(&self, key: &str) {
        self.failing_gets.lock().unwrap().insert(key.to_string());
    }

    pub(crate) fn fail_put_on(&self, key: &str) {
        self.failing_puts.lock().unwrap().insert(key.to_string());
    }

    pub(crate) fn fail_listing(&self) {
        self.failing_list.store(true, Ordering::SeqCst);
    }

    pub(crate) fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub(crate) fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvStore for MemStore {
    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.failing_gets.lock().unwrap().contains(key) {
            return Err(Error::Store(format!("injected get failure: {key}")));
        }
        // Capture the snapshot *before* blocking on the gate so every gated
        // reader observes the same pre-write state, forcing the concurrent
        // interleaving the gate exists to reproduce.
        let value = self.data.lock().unwrap().get(key).cloned();
        if let Some(gate) = &self.read_gate {
            gate.wait().await;
        }
        Ok(value)
    }

    async fn put(&mut self, key: &str, value: &str) -> Result<()> {
        if self.failing_puts.lock().unwrap().contains(key) {
            return Err(Error::Store(format!("injected put failure: {key}")));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&mut self, key: &str) -> Result<()> {
        self.data.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list(&mut self, opts: ListOptions) -> Result<ListPage> {
        if self.failing_list.load(Ordering::SeqCst) {
            return Err(Error::Store("injected list failure".to_string()));
        }

        let mut all = self
            .data
            .lock()
            .unwrap()
            .keys()
            .filter(|k| match &opts.prefix {
                Some(prefix) => k.starts_with(prefix.as_str()),
                None => true,
            })
            .cloned()
            .collect::<Vec<_>>();
        all.sort();

        let offset = match &opts.cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| Error::Store(format!("bad cursor: {cursor}")))?,
            None => 0,
        };
        let end = if opts.limit == 0 {
            all.len()
        } else {
            (offset + opts.limit).min(all.len())
        };

        let keys = all[offset.min(all.len())..end].to_vec();
        let complete = end >= all.len();
        Ok(ListPage {
            keys,
            cursor: (!complete).then(|| end.to_string()),
            complete,
        })
    }
}
