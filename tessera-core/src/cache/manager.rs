use std::collections::HashMap;

use crate::foundation::error::{TesseraError, TesseraResult};
use crate::graph::{NodeId, TextureGraph};

use super::tile::{TileCacheEntry, TileDescriptor};

/// Default entry capacity of a [`CacheTileManager`].
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Per-channel, per-descriptor tile memoization.
///
/// Entries are created lazily on first request and validated against the
/// owning node's upstream fingerprint on every access, so an edit anywhere
/// upstream makes dependent entries recompute without any listener wiring.
/// The entry population is bounded: once it exceeds the configured
/// capacity, least-recently-used entries are dropped (entries touched by
/// the in-flight resolve are never victims). A manager built with
/// `usize::MAX` capacity reproduces unbounded retention.
#[derive(Debug, Clone)]
pub struct CacheTileManager {
    entries: HashMap<(NodeId, TileDescriptor), TileCacheEntry>,
    capacity: usize,
    clock: u64,
}

impl Default for CacheTileManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheTileManager {
    /// Manager with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Manager bounded to `capacity` entries (at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
        }
    }

    /// Number of live cache entries across all channels and descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when an entry exists for this exact key (dirty or not).
    pub fn contains(&self, id: NodeId, desc: &TileDescriptor) -> bool {
        self.entries.contains_key(&(id, *desc))
    }

    /// Peek at an entry without resolving or recomputing it.
    pub fn entry(&self, id: NodeId, desc: &TileDescriptor) -> Option<&TileCacheEntry> {
        self.entries.get(&(id, *desc))
    }

    /// Resolve the up-to-date tile for `id` at `desc`.
    ///
    /// Input tiles are resolved first at the same geometry (dependency
    /// post-order, terminating because the graph is acyclic), then the
    /// node's own entry is computed if stale. Requesting a tile for an
    /// incomplete node is refused.
    #[tracing::instrument(skip(self, graph))]
    pub fn tile(
        &mut self,
        graph: &TextureGraph,
        id: NodeId,
        desc: TileDescriptor,
    ) -> TesseraResult<&TileCacheEntry> {
        if !graph.is_complete(id) {
            return Err(TesseraError::evaluation(
                "tile requested for an incomplete channel",
            ));
        }
        let pass_floor = self.clock + 1;
        self.ensure(graph, id, desc)?;
        self.evict_over_capacity(pass_floor);
        self.entries
            .get(&(id, desc))
            .ok_or_else(|| TesseraError::evaluation("tile entry vanished during resolve"))
    }

    fn ensure(
        &mut self,
        graph: &TextureGraph,
        id: NodeId,
        desc: TileDescriptor,
    ) -> TesseraResult<()> {
        let node = graph
            .node(id)
            .ok_or(TesseraError::UnknownNode(id.0))?;
        let wiring: Vec<Option<NodeId>> = node.inputs().to_vec();
        for src in wiring.iter().flatten() {
            self.ensure(graph, *src, desc)?;
        }

        let fingerprint = graph.upstream_fingerprint(id)?;
        self.clock += 1;
        let now = self.clock;
        let key = (id, desc);

        if let Some(entry) = self.entries.get_mut(&key) {
            if !entry.is_dirty() && entry.fingerprint() == fingerprint {
                entry.set_last_used(now);
                return Ok(());
            }
        }

        let mut entry = self
            .entries
            .remove(&key)
            .unwrap_or_else(|| TileCacheEntry::new(desc));
        {
            let mut input_refs: Vec<Option<&TileCacheEntry>> = Vec::with_capacity(wiring.len());
            for src in &wiring {
                match src {
                    Some(src) => {
                        let input = self.entries.get(&(*src, desc)).ok_or_else(|| {
                            TesseraError::evaluation("input tile missing after resolve")
                        })?;
                        input_refs.push(Some(input));
                    }
                    None => input_refs.push(None),
                }
            }
            entry.compute(node.channel(), &input_refs, fingerprint);
        }
        entry.set_last_used(now);
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Force every entry of `id` (across all descriptors) dirty; the next
    /// resolve recomputes them. Downstream entries are not touched here —
    /// their staleness follows from the fingerprint comparison.
    pub fn set_entries_dirty(&mut self, id: NodeId) {
        for ((node, _), entry) in self.entries.iter_mut() {
            if *node == id {
                entry.mark_dirty();
            }
        }
    }

    /// Drop all cache state for a channel; called when its node leaves
    /// the graph.
    pub fn remove_channel(&mut self, id: NodeId) {
        self.entries.retain(|(node, _), _| *node != id);
    }

    fn evict_over_capacity(&mut self, pass_floor: u64) {
        while self.entries.len() > self.capacity {
            let victim = self
                .entries
                .iter()
                .filter(|(_, e)| e.last_used() < pass_floor)
                .min_by_key(|(_, e)| e.last_used())
                .map(|(k, _)| *k);
            match victim {
                Some(key) => {
                    tracing::debug!(node = key.0 .0, "evicting least-recently-used tile");
                    self.entries.remove(&key);
                }
                // Everything live belongs to the current resolve; the
                // bound is soft for a single oversized request.
                None => break,
            }
        }
    }
}
