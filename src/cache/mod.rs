//! TTL context cache.
//!
//! Schema extraction plus profiling is far too expensive to repeat per
//! question, so the results are held in memory keyed by connection
//! fingerprint. Entries expire after a fixed TTL and are evicted lazily on
//! read; there is no background sweeper. The map is a [`DashMap`], so reads
//! and writes from concurrent request handlers need no outer lock.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::profile::DatabaseProfile;
use crate::schema::SchemaGraph;

/// A cached schema + profile pair for one database.
#[derive(Debug, Clone)]
pub struct ContextEntry {
    pub schema: SchemaGraph,
    pub profile: DatabaseProfile,
    pub database: String,
    created_at: Instant,
}

impl ContextEntry {
    pub fn new(schema: SchemaGraph, profile: DatabaseProfile) -> Self {
        let database = schema.database_name.clone();
        Self {
            schema,
            profile,
            database,
            created_at: Instant::now(),
        }
    }

    /// Age of this entry.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Snapshot of cache occupancy for the stats surface.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub databases: Vec<String>,
    pub ttl_seconds: u64,
}

/// Fingerprint-keyed cache of database contexts with a fixed TTL.
pub struct ContextCache {
    entries: DashMap<String, ContextEntry>,
    ttl: Duration,
}

impl ContextCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch a live entry, evicting it first if it has expired.
    pub fn get(&self, fingerprint: &str) -> Option<ContextEntry> {
        let expired = match self.entries.get(fingerprint) {
            Some(entry) if entry.age() < self.ttl => return Some(entry.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            // The read guard must be dropped before removal.
            self.entries.remove(fingerprint);
            debug!(fingerprint, "evicted expired context entry");
        }
        None
    }

    /// Insert or replace the entry for a fingerprint.
    pub fn put(&self, fingerprint: String, entry: ContextEntry) {
        debug!(
            fingerprint = fingerprint.as_str(),
            database = entry.database.as_str(),
            "caching context"
        );
        self.entries.insert(fingerprint, entry);
    }

    /// Drop the entry for one fingerprint. Returns whether one existed.
    pub fn invalidate(&self, fingerprint: &str) -> bool {
        self.entries.remove(fingerprint).is_some()
    }

    /// Drop every entry.
    pub fn clear_all(&self) {
        self.entries.clear();
    }

    /// Occupancy snapshot. Expired entries still count until a read or
    /// write touches them.
    pub fn stats(&self) -> CacheStats {
        let mut databases: Vec<String> = self
            .entries
            .iter()
            .map(|entry| entry.database.clone())
            .collect();
        databases.sort();
        CacheStats {
            entry_count: self.entries.len(),
            databases,
            ttl_seconds: self.ttl.as_secs(),
        }
    }
}
