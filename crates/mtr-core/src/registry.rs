//! ---
//! mtr_section: "01-core-functionality"
//! mtr_subsection: "module"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Primary orchestration and lifecycle management."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
use std::collections::hash_map::{Entry, RandomState};
use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::RegistryError;

pub const DEFAULT_SHARDS: usize = 16;

struct Slot<E: ?Sized> {
    seq: u64,
    engine: Arc<E>,
}

type Shard<E> = RwLock<HashMap<String, Slot<E>>>;

/// Concurrent map from tenant id to tenant engine.
///
/// Keys are striped across independently locked shards, so a write only contends with
/// operations on the same shard. Each insertion is stamped with a sequence number and
/// snapshots are returned in insertion order.
pub struct TenantEngineRegistry<E: ?Sized> {
    shards: Box<[Shard<E>]>,
    hasher: RandomState,
    next_seq: AtomicU64,
}

impl<E: ?Sized + Send + Sync> TenantEngineRegistry<E> {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Registry with `shards` lock partitions (at least one).
    pub fn with_shards(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            shards: (0..shards).map(|_| RwLock::new(HashMap::new())).collect(),
            hasher: RandomState::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, tenant_id: &str) -> &Shard<E> {
        let index = (self.hasher.hash_one(tenant_id) % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    pub fn get(&self, tenant_id: &str) -> Result<Arc<E>, RegistryError> {
        self.shard(tenant_id)
            .read()
            .get(tenant_id)
            .map(|slot| slot.engine.clone())
            .ok_or_else(|| RegistryError::TenantEngineNotFound(tenant_id.to_owned()))
    }

    pub fn contains(&self, tenant_id: &str) -> bool {
        self.shard(tenant_id).read().contains_key(tenant_id)
    }

    /// Register `engine` for `tenant_id`; an existing engine must be removed first.
    pub fn put(&self, tenant_id: impl Into<String>, engine: Arc<E>) -> Result<(), RegistryError> {
        let tenant_id = tenant_id.into();
        let mut shard = self.shard(&tenant_id).write();
        match shard.entry(tenant_id) {
            Entry::Occupied(entry) => Err(RegistryError::DuplicateTenantEngine(entry.key().clone())),
            Entry::Vacant(entry) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                debug!(tenant = %entry.key(), seq, "tenant engine registered");
                entry.insert(Slot { seq, engine });
                Ok(())
            }
        }
    }

    pub fn remove(&self, tenant_id: &str) -> Result<Arc<E>, RegistryError> {
        let removed = self.shard(tenant_id).write().remove(tenant_id);
        match removed {
            Some(slot) => {
                debug!(tenant = tenant_id, "tenant engine removed");
                Ok(slot.engine)
            }
            None => Err(RegistryError::TenantEngineNotFound(tenant_id.to_owned())),
        }
    }

    /// Consistent view of every registered engine, in insertion order.
    ///
    /// All shard read locks are held together while the view is collected.
    pub fn snapshot(&self) -> Vec<(String, Arc<E>)> {
        let guards: Vec<_> = self.shards.iter().map(|shard| shard.read()).collect();
        let mut entries: Vec<(u64, String, Arc<E>)> = guards
            .iter()
            .flat_map(|shard| {
                shard
                    .iter()
                    .map(|(id, slot)| (slot.seq, id.clone(), slot.engine.clone()))
            })
            .collect();
        drop(guards);
        entries.sort_by_key(|(seq, _, _)| *seq);
        entries
            .into_iter()
            .map(|(_, id, engine)| (id, engine))
            .collect()
    }

    /// Atomically empty the registry, returning its former contents in insertion order.
    pub fn drain(&self) -> Vec<(String, Arc<E>)> {
        let mut guards: Vec<_> = self.shards.iter().map(|shard| shard.write()).collect();
        let mut entries: Vec<(u64, String, Arc<E>)> = guards
            .iter_mut()
            .flat_map(|shard| {
                shard
                    .drain()
                    .map(|(id, slot)| (slot.seq, id, slot.engine))
            })
            .collect();
        drop(guards);
        entries.sort_by_key(|(seq, _, _)| *seq);
        entries
            .into_iter()
            .map(|(_, id, engine)| (id, engine))
            .collect()
    }

    pub fn tenant_ids(&self) -> Vec<String> {
        self.snapshot().into_iter().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }
}

impl<E: ?Sized + Send + Sync> Default for TenantEngineRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized> fmt::Debug for TenantEngineRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantEngineRegistry")
            .field("shards", &self.shards.len())
            .finish()
    }
}
