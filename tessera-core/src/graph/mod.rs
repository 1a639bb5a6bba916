//! The texture graph: nodes, connections and structural editing.

mod node;
mod texture;

pub use node::{ConnectionPoint, GraphNode, NodeId, NODE_HEIGHT, NODE_WIDTH};
pub use texture::{Connection, TextureGraph};
