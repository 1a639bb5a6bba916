use kurbo::{Point, Rect, Size};

use crate::channel::{Channel, OutputType};

/// Editor-facing node width in layout units.
pub const NODE_WIDTH: f64 = 96.0;
/// Editor-facing node height in layout units.
pub const NODE_HEIGHT: f64 = 64.0;

/// Stable identifier of a node within one [`super::TextureGraph`].
///
/// Ids are allocated monotonically and never reused, so ascending id order
/// is insertion order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct NodeId(pub u64);

/// An identified input or output slot on a node.
///
/// The single output point carries index `-1`; input points carry their
/// slot index `0..arity`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConnectionPoint {
    /// Owning node.
    pub node: NodeId,
    /// `-1` for the output point, the input slot index otherwise.
    pub index: i32,
    /// Sample type flowing through this point.
    pub ty: OutputType,
}

impl ConnectionPoint {
    /// True for the node's output point.
    pub fn is_output(&self) -> bool {
        self.index == -1
    }
}

/// A graph node: one channel plus layout position, wiring and points.
#[derive(Debug, Clone)]
pub struct GraphNode {
    id: NodeId,
    /// Layout position of the node's top-left corner.
    pub pos: Point,
    channel: Box<dyn Channel>,
    inputs: Vec<Option<NodeId>>,
    points: Vec<ConnectionPoint>,
    version: u64,
}

impl GraphNode {
    pub(crate) fn new(id: NodeId, channel: Box<dyn Channel>, pos: Point) -> Self {
        let mut node = Self {
            id,
            pos,
            channel,
            inputs: Vec::new(),
            points: Vec::new(),
            version: 0,
        };
        node.rebuild_points();
        node
    }

    /// This node's id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The wrapped channel.
    pub fn channel(&self) -> &dyn Channel {
        self.channel.as_ref()
    }

    pub(crate) fn channel_mut(&mut self) -> &mut dyn Channel {
        self.channel.as_mut()
    }

    /// Current input wiring, one entry per input slot.
    pub fn inputs(&self) -> &[Option<NodeId>] {
        &self.inputs
    }

    pub(crate) fn set_input(&mut self, slot: usize, source: Option<NodeId>) {
        self.inputs[slot] = source;
    }

    /// Monotonically increasing change version; bumped on every parameter
    /// or wiring change. Cache entries compare against it via the graph's
    /// upstream fingerprint.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn touch(&mut self) {
        self.version += 1;
    }

    /// Replace the wrapped channel, regenerating connection points and
    /// preserving wiring on slots that still exist.
    pub(crate) fn set_channel(&mut self, channel: Box<dyn Channel>) {
        self.channel = channel;
        self.rebuild_points();
        self.touch();
    }

    /// Connection points: output point first, then one per input slot.
    pub fn points(&self) -> &[ConnectionPoint] {
        &self.points
    }

    /// The node's single output point.
    pub fn output_point(&self) -> ConnectionPoint {
        self.points[0]
    }

    /// Look up a connection point by its stored index (`-1` = output).
    ///
    /// A miss means arity and point list have drifted apart; it is logged
    /// as an internal invariant violation and yields `None`.
    pub fn connection_point_by_index(&self, index: i32) -> Option<ConnectionPoint> {
        let found = self.points.iter().find(|p| p.index == index).copied();
        if found.is_none() {
            tracing::error!(node = self.id.0, index, "connection point index not found");
        }
        found
    }

    /// Layout bounds used for hit testing.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.pos, Size::new(NODE_WIDTH, NODE_HEIGHT))
    }

    /// Deep-clone the node's channel (full parameter state) and position
    /// into a detached copy with no wiring. Connections are graph-level
    /// and must be re-established by the caller.
    pub(crate) fn clone_detached(&self, id: NodeId) -> GraphNode {
        GraphNode::new(id, self.channel.boxed_clone(), self.pos)
    }

    fn rebuild_points(&mut self) {
        let arity = self.channel.input_types().len();
        self.inputs.resize(arity, None);

        self.points.clear();
        self.points.push(ConnectionPoint {
            node: self.id,
            index: -1,
            ty: self.channel.output_type(),
        });
        for (slot, ty) in self.channel.input_types().iter().enumerate() {
            self.points.push(ConnectionPoint {
                node: self.id,
                index: slot as i32,
                ty: *ty,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::filters::Blend;
    use crate::channel::generators::Checker;

    #[test]
    fn points_track_channel_arity() {
        let node = GraphNode::new(NodeId(1), Box::new(Blend::new()), Point::ZERO);
        assert_eq!(node.points().len(), 3);
        assert!(node.points()[0].is_output());
        assert_eq!(node.points()[1].index, 0);
        assert_eq!(node.points()[2].index, 1);
        assert_eq!(node.inputs().len(), 2);
    }

    #[test]
    fn set_channel_regenerates_points_and_bumps_version() {
        let mut node = GraphNode::new(NodeId(1), Box::new(Blend::new()), Point::ZERO);
        let v0 = node.version();
        node.set_channel(Box::new(Checker::new()));
        assert_eq!(node.points().len(), 1);
        assert!(node.inputs().is_empty());
        assert!(node.version() > v0);
    }

    #[test]
    fn point_lookup_by_stored_index() {
        let node = GraphNode::new(NodeId(3), Box::new(Blend::new()), Point::ZERO);
        assert!(node.connection_point_by_index(-1).unwrap().is_output());
        assert_eq!(node.connection_point_by_index(1).unwrap().index, 1);
        assert!(node.connection_point_by_index(7).is_none());
    }

    #[test]
    fn detached_clone_has_no_wiring() {
        let mut node = GraphNode::new(NodeId(1), Box::new(Blend::new()), Point::new(4.0, 5.0));
        node.set_input(0, Some(NodeId(9)));
        let copy = node.clone_detached(NodeId(2));
        assert_eq!(copy.id(), NodeId(2));
        assert_eq!(copy.pos, Point::new(4.0, 5.0));
        assert!(copy.inputs().iter().all(Option::is_none));
    }
}
