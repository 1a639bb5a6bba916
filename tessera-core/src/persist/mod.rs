//! Whitespace-token text format for channels and whole graphs.

mod text;

pub use text::{import_graph, load_channel, load_graph, save_channel, save_graph};
