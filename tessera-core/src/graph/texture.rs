use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use kurbo::Point;

use crate::channel::{Channel, InputSource, DERIVATIVE_STEP};
use crate::channel::params::ParamValue;
use crate::foundation::color::Rgba;
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::foundation::math::{wrap_unit, Fnv1a64};

use super::node::{ConnectionPoint, GraphNode, NodeId};

/// A directed edge from one node's output point to another node's input
/// point.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Connection {
    /// Source point; always an output point (index -1).
    pub source: ConnectionPoint,
    /// Target point; always an input point (index >= 0).
    pub target: ConnectionPoint,
}

impl Connection {
    /// Build a connection, validating point orientation.
    pub fn new(source: ConnectionPoint, target: ConnectionPoint) -> TesseraResult<Self> {
        if !source.is_output() {
            return Err(TesseraError::validation(
                "connection source must be an output point (index -1)",
            ));
        }
        if target.index < 0 {
            return Err(TesseraError::validation(
                "connection target must be an input point (index >= 0)",
            ));
        }
        Ok(Self { source, target })
    }

    /// The target's input slot index.
    pub fn target_slot(&self) -> usize {
        self.target.index as usize
    }
}

/// A mutable DAG of texture channels.
///
/// The graph owns its nodes (arena keyed by [`NodeId`]), the connection
/// list and the selection set, and is the single mutation gateway: every
/// structural or parameter edit goes through it so node change versions
/// stay truthful for cache invalidation.
#[derive(Debug, Default, Clone)]
pub struct TextureGraph {
    nodes: BTreeMap<NodeId, GraphNode>,
    connections: Vec<Connection>,
    selected: BTreeSet<NodeId>,
    next_id: u64,
}

impl TextureGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // ---- nodes ----------------------------------------------------------

    /// Add a node wrapping `channel` at `pos`; returns its id.
    pub fn add_node(&mut self, channel: Box<dyn Channel>, pos: Point) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, GraphNode::new(id, channel, pos));
        id
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All connections.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Number of connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Delete a node: severs every incident connection first, then removes
    /// the node (and, when `also_unselect`, its selection membership).
    ///
    /// Cache state for the node is owned by the cache manager; callers
    /// pair this with [`crate::CacheTileManager::remove_channel`].
    pub fn delete_node(&mut self, id: NodeId, also_unselect: bool) {
        if !self.nodes.contains_key(&id) {
            tracing::error!(node = id.0, "delete_node: unknown node");
            return;
        }
        let incident: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| c.source.node == id || c.target.node == id)
            .copied()
            .collect();
        for c in incident {
            self.remove_connection(&c);
        }
        if also_unselect {
            self.selected.remove(&id);
        }
        self.nodes.remove(&id);
    }

    /// Swap a node's channel kind in place, preserving structure
    /// best-effort.
    ///
    /// A new node is created at the old node's position; connections that
    /// sourced from the old output re-source from the new output; input
    /// connections re-target matching slots in ascending order; inputs
    /// beyond the new channel's arity are dropped. The old node is deleted
    /// last.
    pub fn replace_node(
        &mut self,
        old: NodeId,
        channel: Box<dyn Channel>,
    ) -> TesseraResult<NodeId> {
        let pos = self
            .nodes
            .get(&old)
            .ok_or(TesseraError::UnknownNode(old.0))?
            .pos;
        let new_id = self.add_node(channel, pos);

        let outgoing: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| c.source.node == old)
            .copied()
            .collect();
        for c in outgoing {
            self.remove_connection(&c);
            if let Some(new_node) = self.nodes.get(&new_id) {
                let rewired = Connection::new(new_node.output_point(), c.target);
                if let Ok(conn) = rewired {
                    self.add_connection(conn);
                }
            }
        }

        let old_arity = self.nodes.get(&old).map_or(0, |n| n.inputs().len());
        let new_arity = self.nodes.get(&new_id).map_or(0, |n| n.inputs().len());
        for slot in 0..old_arity {
            let Some(old_point) = self
                .nodes
                .get(&old)
                .and_then(|n| n.connection_point_by_index(slot as i32))
            else {
                continue;
            };
            let Some(c) = self.connection_at(&old_point).copied() else {
                continue;
            };
            self.remove_connection(&c);
            if slot < new_arity {
                if let Some(new_point) = self
                    .nodes
                    .get(&new_id)
                    .and_then(|n| n.connection_point_by_index(slot as i32))
                {
                    if let Ok(conn) = Connection::new(c.source, new_point) {
                        self.add_connection(conn);
                    }
                }
            }
        }

        self.delete_node(old, true);
        Ok(new_id)
    }

    /// Duplicate a node: deep-clones the channel's full parameter state
    /// and the position, with no wiring (connections are graph-level and
    /// are re-established by the caller if desired).
    pub fn duplicate_node(&mut self, id: NodeId) -> TesseraResult<NodeId> {
        let new_id = NodeId(self.next_id);
        let copy = self
            .nodes
            .get(&id)
            .ok_or(TesseraError::UnknownNode(id.0))?
            .clone_detached(new_id);
        self.next_id += 1;
        self.nodes.insert(new_id, copy);
        Ok(new_id)
    }

    /// Top-most node whose layout bounds contain `p` (last added wins).
    pub fn node_at_position(&self, p: Point) -> Option<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.bounds().contains(p))
            .last()
            .map(|n| n.id())
    }

    // ---- connections ----------------------------------------------------

    /// Convenience for [`TextureGraph::add_connection`]: wire `source`'s
    /// output into `target`'s input `slot`.
    pub fn connect(&mut self, source: NodeId, target: NodeId, slot: usize) -> bool {
        let (Some(src), Some(tgt)) = (self.nodes.get(&source), self.nodes.get(&target)) else {
            tracing::warn!(source = source.0, target = target.0, "connect: unknown node");
            return false;
        };
        let Some(target_point) = tgt.connection_point_by_index(slot as i32) else {
            return false;
        };
        match Connection::new(src.output_point(), target_point) {
            Ok(c) => self.add_connection(c),
            Err(e) => {
                tracing::warn!(error = %e, "connect: invalid connection");
                false
            }
        }
    }

    /// Add a connection; returns `false` (graph unchanged) when it would
    /// create a cycle or references stale points. An existing connection
    /// at the target input point is superseded.
    pub fn add_connection(&mut self, c: Connection) -> bool {
        if !self.nodes.contains_key(&c.source.node) || !self.nodes.contains_key(&c.target.node) {
            tracing::warn!(
                source = c.source.node.0,
                target = c.target.node.0,
                "add_connection: node not in graph"
            );
            return false;
        }
        let slot = c.target_slot();
        let arity = self.nodes.get(&c.target.node).map_or(0, |n| n.inputs().len());
        if slot >= arity {
            tracing::warn!(
                target = c.target.node.0,
                slot,
                arity,
                "add_connection: input slot out of range"
            );
            return false;
        }
        if self.would_create_cycle(c.source.node, c.target.node) {
            tracing::warn!(
                source = c.source.node.0,
                target = c.target.node.0,
                "add_connection: rejected, would create a cycle"
            );
            return false;
        }

        if let Some(existing) = self.connection_at(&c.target).copied() {
            self.remove_connection(&existing);
        }

        if let Some(node) = self.nodes.get_mut(&c.target.node) {
            node.set_input(slot, Some(c.source.node));
            node.touch();
        }
        self.connections.push(c);
        true
    }

    /// Remove a connection; a connection not present in the graph is
    /// logged and ignored.
    pub fn remove_connection(&mut self, c: &Connection) {
        let Some(pos) = self.connections.iter().position(|x| x == c) else {
            tracing::error!(
                source = c.source.node.0,
                target = c.target.node.0,
                "remove_connection: connection not in graph"
            );
            return;
        };
        self.connections.remove(pos);
        if let Some(node) = self.nodes.get_mut(&c.target.node) {
            node.set_input(c.target_slot(), None);
            node.touch();
        }
    }

    /// Remove a batch of connections. Taking the batch by value snapshots
    /// it, so passing a copy of [`TextureGraph::connections`] is safe.
    pub fn remove_connections(&mut self, batch: Vec<Connection>) {
        for c in &batch {
            self.remove_connection(c);
        }
    }

    /// The connection terminating at `target`, if any.
    pub fn connection_at(&self, target: &ConnectionPoint) -> Option<&Connection> {
        self.connections.iter().find(|c| c.target == *target)
    }

    fn would_create_cycle(&self, source: NodeId, target: NodeId) -> bool {
        if source == target {
            return true;
        }
        // Walk downstream from the candidate target; reaching the candidate
        // source means the new edge would close a loop. Bounded by the node
        // count even if the edge set is somehow already inconsistent.
        let mut stack = vec![target];
        let mut visited: HashSet<NodeId> = HashSet::new();
        while let Some(n) = stack.pop() {
            if !visited.insert(n) {
                continue;
            }
            if visited.len() > self.nodes.len() {
                tracing::error!("cycle check visited more nodes than exist");
                return true;
            }
            for c in self.connections.iter().filter(|c| c.source.node == n) {
                if c.target.node == source {
                    return true;
                }
                stack.push(c.target.node);
            }
        }
        false
    }

    // ---- selection ------------------------------------------------------

    /// Add a node to the selection set.
    pub fn select(&mut self, id: NodeId) {
        if self.nodes.contains_key(&id) {
            self.selected.insert(id);
        } else {
            tracing::error!(node = id.0, "select: unknown node");
        }
    }

    /// Remove a node from the selection set.
    pub fn deselect(&mut self, id: NodeId) {
        self.selected.remove(&id);
    }

    /// Currently selected node ids.
    pub fn selection(&self) -> &BTreeSet<NodeId> {
        &self.selected
    }

    /// Clear the selection set.
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Delete every selected node, then clear the selection.
    pub fn delete_selection(&mut self) {
        let ids: Vec<NodeId> = self.selected.iter().copied().collect();
        for id in ids {
            self.delete_node(id, false);
        }
        self.selected.clear();
    }

    // ---- parameters and change tracking ---------------------------------

    /// Set a parameter on a node's channel, bumping its change version.
    pub fn set_param(&mut self, id: NodeId, name: &str, value: ParamValue) -> TesseraResult<()> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(TesseraError::UnknownNode(id.0))?;
        node.channel_mut().params_mut().set(name, value)?;
        node.touch();
        Ok(())
    }

    /// Bump a node's change version without editing a parameter (the
    /// bulk/silent-change notification of batch configuration).
    pub fn touch(&mut self, id: NodeId) -> TesseraResult<()> {
        self.nodes
            .get_mut(&id)
            .ok_or(TesseraError::UnknownNode(id.0))?
            .touch();
        Ok(())
    }

    /// Front-load file IO for every channel (bitmap decode). Counts as a
    /// bulk change: every node's version is bumped.
    pub fn prepare_assets(&mut self, assets_root: &Path) -> TesseraResult<()> {
        for node in self.nodes.values_mut() {
            node.channel_mut().prepare(assets_root)?;
            node.touch();
        }
        Ok(())
    }

    /// Fingerprint of a node's upstream subgraph: ids, change versions,
    /// kinds and wiring of the node and everything it depends on. Cache
    /// entries store this at compute time; any upstream edit changes the
    /// fingerprint of every downstream node, which is what propagates
    /// invalidation without listener bookkeeping.
    pub fn upstream_fingerprint(&self, id: NodeId) -> TesseraResult<u64> {
        let mut h = Fnv1a64::new_default();
        self.fingerprint_into(id, &mut h)?;
        Ok(h.finish())
    }

    fn fingerprint_into(&self, id: NodeId, h: &mut Fnv1a64) -> TesseraResult<()> {
        let node = self.nodes.get(&id).ok_or(TesseraError::UnknownNode(id.0))?;
        h.write_u64(id.0);
        h.write_u64(node.version());
        h.write_bytes(node.channel().kind().as_bytes());
        for input in node.inputs() {
            match input {
                Some(src) => {
                    h.write_u8(1);
                    self.fingerprint_into(*src, h)?;
                }
                None => h.write_u8(0),
            }
        }
        Ok(())
    }

    // ---- evaluation -----------------------------------------------------

    /// True iff every input of `id` is wired and itself complete,
    /// recursively. Generators are vacuously complete. Incomplete nodes
    /// must not be rasterized.
    pub fn is_complete(&self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        node.inputs().iter().all(|input| match input {
            Some(src) => self.is_complete(*src),
            None => false,
        })
    }

    /// Evaluate a node at (u, v); coordinates are wrapped into `[0, 1)`.
    ///
    /// Precondition: the node is complete. Evaluating across an unwired
    /// input panics (see [`InputSource::sample`]).
    pub fn value_rgba(&self, id: NodeId, u: f32, v: f32) -> TesseraResult<Rgba> {
        let node = self.nodes.get(&id).ok_or(TesseraError::UnknownNode(id.0))?;
        Ok(self.eval_node(node, u, v))
    }

    /// Finite-difference derivative of a node's output along `u`.
    pub fn derivative_u(&self, id: NodeId, u: f32, v: f32) -> TesseraResult<Rgba> {
        let plus = self.value_rgba(id, u + DERIVATIVE_STEP, v)?;
        let base = self.value_rgba(id, u, v)?;
        Ok((plus - base) * (1.0 / DERIVATIVE_STEP))
    }

    /// Finite-difference derivative of a node's output along `v`.
    pub fn derivative_v(&self, id: NodeId, u: f32, v: f32) -> TesseraResult<Rgba> {
        let plus = self.value_rgba(id, u, v + DERIVATIVE_STEP)?;
        let base = self.value_rgba(id, u, v)?;
        Ok((plus - base) * (1.0 / DERIVATIVE_STEP))
    }

    pub(crate) fn eval_node(&self, node: &GraphNode, u: f32, v: f32) -> Rgba {
        let inputs = GraphInputs { graph: self, node };
        node.channel().value_rgba(&inputs, wrap_unit(u), wrap_unit(v))
    }
}

/// Direct-path input source: recursively evaluates upstream channels.
struct GraphInputs<'a> {
    graph: &'a TextureGraph,
    node: &'a GraphNode,
}

impl InputSource for GraphInputs<'_> {
    fn arity(&self) -> usize {
        self.node.inputs().len()
    }

    fn sample(&self, slot: usize, u: f32, v: f32) -> Rgba {
        let Some(wired) = self.node.inputs().get(slot) else {
            tracing::error!(
                node = self.node.id().0,
                slot,
                "input sample beyond declared arity"
            );
            return Rgba::TRANSPARENT;
        };
        let Some(src) = wired else {
            panic!(
                "evaluated unwired input slot {slot} of node {}; \
                 check completeness before evaluation",
                self.node.id().0
            );
        };
        let Some(src_node) = self.graph.node(*src) else {
            tracing::error!(
                node = self.node.id().0,
                input = src.0,
                "wired input no longer in graph"
            );
            return Rgba::TRANSPARENT;
        };
        self.graph.eval_node(src_node, u, v)
    }
}
