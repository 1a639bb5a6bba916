//! Tessera is a procedural texture graph engine.
//!
//! A texture is a directed acyclic graph of channels (pattern generators
//! and image filters), evaluated at normalized `(u, v)` coordinates.
//! Repeated evaluation of the same region is accelerated by a tile cache
//! that memoizes per-channel, per-resolution sample tiles.
//!
//! # Pipeline overview
//!
//! 1. **Edit**: build and mutate a [`TextureGraph`] (nodes, connections,
//!    parameters); structural invariants (acyclicity, one connection per
//!    input) are enforced at mutation time.
//! 2. **Evaluate**: sample any complete channel directly via
//!    [`TextureGraph::value_rgba`], or resolve bordered sample tiles
//!    through a [`CacheTileManager`].
//! 3. **Export**: rasterize a channel to a [`FrameRgba`] with
//!    [`render_frame`] (direct, row-parallel) or [`render_frame_tiled`]
//!    (cache-backed).
//! 4. **Persist**: save and load graphs in a whitespace-token text format
//!    ([`save_graph`] / [`load_graph`]).
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic-by-default**: channels are pure functions of
//!   coordinates, parameters and inputs; the cache is an optimization,
//!   never a semantic change.
//! - **No IO in evaluation**: file IO is front-loaded in
//!   [`TextureGraph::prepare_assets`].
//!
//! # Getting started
//!
//! ```
//! use tessera::{NormalMap, Point, TextureGraph, ValueNoise};
//!
//! let mut graph = TextureGraph::new();
//! let noise = graph.add_node(Box::new(ValueNoise::new()), Point::ZERO);
//! let relief = graph.add_node(Box::new(NormalMap::new()), Point::new(160.0, 0.0));
//! assert!(graph.connect(noise, relief, 0));
//!
//! let frame = tessera::render_frame(&graph, relief, 32, 32)?;
//! assert_eq!(frame.data.len(), 32 * 32);
//! # Ok::<(), tessera::TesseraError>(())
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cache;
mod channel;
mod foundation;
mod graph;
mod persist;
mod raster;

pub use kurbo::{Point, Rect};

pub use cache::{CacheTileManager, TileCacheEntry, TileDescriptor, DEFAULT_CACHE_CAPACITY};
pub use channel::filters::{AffineWarp, Blend, BoxBlur, BrightnessContrast, NormalMap};
pub use channel::generators::{BitmapSource, Checker, ConstantColor, GradientRamp, ValueNoise};
pub use channel::params::{Gradient, Param, ParamSet, ParamValue};
pub use channel::registry::{create as create_channel, KINDS as CHANNEL_KINDS};
pub use channel::{
    derivative_u, derivative_v, Channel, InputSource, NoInputs, OutputType, DERIVATIVE_STEP,
};
pub use foundation::color::Rgba;
pub use foundation::error::{TesseraError, TesseraResult};
pub use foundation::math::wrap_unit;
pub use graph::{
    Connection, ConnectionPoint, GraphNode, NodeId, TextureGraph, NODE_HEIGHT, NODE_WIDTH,
};
pub use persist::{import_graph, load_channel, load_graph, save_channel, save_graph};
pub use raster::{render_frame, render_frame_tiled, FrameRgba};
