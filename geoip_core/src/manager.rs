//! Copy-on-write holder of the active [`IpIndex`].
//!
//! Every `update` builds a brand-new index with no lock held and only takes
//! the write lock to swap one `Arc`. Readers take the read lock just long
//! enough to clone that `Arc`, so a query always walks a single, complete
//! snapshot and superseded indexes are freed once their last reader is done.

use crate::constants::{
    METRIC_ACTIVE_PREFIXES, METRIC_QUERIES, METRIC_QUERY_MISSES, METRIC_UPDATES,
    METRIC_UPDATE_FAILURES,
};
use crate::errors::{Error, Result};
use crate::index::{IndexStats, IpIndex};
use crate::range::IntoCidr;
use crate::source::DataSource;
use crate::telemetry;
use log::{debug, error, info, warn};
use metrics::{counter, gauge};
use once_cell::sync::OnceCell;
use std::net::IpAddr;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

pub struct IpManager<T> {
    active: RwLock<Arc<IpIndex<T>>>,
}

impl<T> IpManager<T> {
    // ---- logging bootstraper -------------------------------------------------
    fn ensure_logging() {
        static INIT: OnceCell<()> = OnceCell::new();
        INIT.get_or_init(|| {
            let _ = env_logger::builder()
                .format_timestamp(None)
                .is_test(std::env::var("RUST_TEST_THREADS").is_ok())
                .try_init();
        });
    }

    /// Fetch from `source` and build the first index. Fails instead of
    /// handing out a manager with nothing loaded.
    pub fn new<S>(source: &S) -> Result<Self>
    where
        S: DataSource<Payload = T>,
    {
        let dataset = source.fetch().map_err(|e| {
            error!("[INIT] initial fetch failed: {e}");
            Error::from(e)
        })?;
        Self::with_dataset(dataset)
    }

    /// Build the first index from an already-fetched dataset.
    pub fn with_dataset<C, I>(dataset: I) -> Result<Self>
    where
        C: IntoCidr,
        I: IntoIterator<Item = (C, T)>,
    {
        Self::ensure_logging();
        telemetry::init();
        let index = Self::build(dataset).inspect_err(|e| {
            error!("[INIT] initial build failed: {e}");
        })?;
        Self::publish(&index);
        Ok(Self {
            active: RwLock::new(Arc::new(index)),
        })
    }

    fn build<C, I>(dataset: I) -> Result<IpIndex<T>>
    where
        C: IntoCidr,
        I: IntoIterator<Item = (C, T)>,
    {
        let started = Instant::now();
        let mut index = IpIndex::new();
        for (position, (cidr, payload)) in dataset.into_iter().enumerate() {
            let text = cidr.describe();
            if let Err(source) = index.insert(cidr, payload) {
                counter!(METRIC_UPDATE_FAILURES).increment(1);
                warn!("[UPDATE] rejected entry #{position} {text:?}: {}", source.reason());
                return Err(Error::BuildAborted {
                    position,
                    cidr: text,
                    source,
                });
            }
        }
        let stats = index.stats();
        debug!(
            "[UPDATE] built index: v4 {} prefixes/{} nodes, v6 {} prefixes/{} nodes in {:?}",
            stats.v4_prefixes,
            stats.v4_nodes,
            stats.v6_prefixes,
            stats.v6_nodes,
            started.elapsed()
        );
        Ok(index)
    }

    fn publish(index: &IpIndex<T>) {
        counter!(METRIC_UPDATES).increment(1);
        gauge!(METRIC_ACTIVE_PREFIXES).set(index.stats().prefixes() as f64);
    }

    /// Replace the whole dataset. On any bad entry nothing is installed and
    /// the previous index keeps serving.
    pub fn update<C, I>(&self, dataset: I) -> Result<()>
    where
        C: IntoCidr,
        I: IntoIterator<Item = (C, T)>,
    {
        let index = Arc::new(Self::build(dataset)?);
        Self::publish(&index);
        let prefixes = index.stats().prefixes();

        let previous = {
            let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *active, index)
        };
        info!("[UPDATE] installed index with {prefixes} prefixes");
        // the old index is released outside the lock
        drop(previous);
        Ok(())
    }

    /// Fetch from `source` and [`update`](Self::update). A failed fetch leaves
    /// the active index untouched.
    pub fn refresh<S>(&self, source: &S) -> Result<()>
    where
        S: DataSource<Payload = T>,
    {
        let dataset = source.fetch().map_err(|e| {
            counter!(METRIC_UPDATE_FAILURES).increment(1);
            warn!("[REFRESH] fetch failed, keeping current index: {e}");
            Error::from(e)
        })?;
        self.update(dataset)
    }

    /// The index currently serving queries.
    pub fn snapshot(&self) -> Arc<IpIndex<T>> {
        let active = self.active.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&active)
    }

    /// Longest-prefix match for a textual address; unparsable text is a miss.
    pub fn query(&self, addr: &str) -> Option<Arc<T>> {
        let hit = self.snapshot().search(addr).cloned();
        Self::record_query(hit.is_some());
        hit
    }

    pub fn query_address(&self, addr: IpAddr) -> Option<Arc<T>> {
        let hit = self.snapshot().search_addr(addr).cloned();
        Self::record_query(hit.is_some());
        hit
    }

    #[inline]
    fn record_query(hit: bool) {
        counter!(METRIC_QUERIES).increment(1);
        if !hit {
            counter!(METRIC_QUERY_MISSES).increment(1);
        }
    }

    pub fn stats(&self) -> IndexStats {
        self.snapshot().stats()
    }
}
