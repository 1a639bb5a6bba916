use rayon::prelude::*;

use crate::cache::{CacheTileManager, TileDescriptor};
use crate::foundation::color::Rgba;
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::graph::{NodeId, TextureGraph};

use super::frame::FrameRgba;

/// Rasterize a channel directly, one evaluation per pixel center.
///
/// Rows render in parallel; evaluation is pure over an immutable graph,
/// so this is the one sanctioned use of parallelism in the engine.
/// Rendering an incomplete channel is refused.
#[tracing::instrument(skip(graph))]
pub fn render_frame(
    graph: &TextureGraph,
    id: NodeId,
    width: u32,
    height: u32,
) -> TesseraResult<FrameRgba> {
    if width == 0 || height == 0 {
        return Err(TesseraError::validation("frame size must be > 0"));
    }
    let node = graph.node(id).ok_or(TesseraError::UnknownNode(id.0))?;
    if !graph.is_complete(id) {
        return Err(TesseraError::evaluation(
            "cannot render an incomplete channel",
        ));
    }

    let rows: Vec<Vec<Rgba>> = (0..height)
        .into_par_iter()
        .map(|y| {
            let v = (y as f32 + 0.5) / height as f32;
            (0..width)
                .map(|x| graph.eval_node(node, (x as f32 + 0.5) / width as f32, v))
                .collect()
        })
        .collect();

    let mut data = Vec::with_capacity((width as usize) * (height as usize));
    for row in rows {
        data.extend(row);
    }
    Ok(FrameRgba {
        width,
        height,
        data,
    })
}

/// Rasterize a channel by assembling cache tiles of `tile_size` with the
/// given border, reusing (and populating) `cache`.
///
/// Produces the same samples as [`render_frame`] for pixel centers; the
/// cache is an optimization, not a semantic change.
#[tracing::instrument(skip(graph, cache))]
pub fn render_frame_tiled(
    graph: &TextureGraph,
    cache: &mut CacheTileManager,
    id: NodeId,
    width: u32,
    height: u32,
    tile_size: u32,
    border: u32,
) -> TesseraResult<FrameRgba> {
    if width == 0 || height == 0 {
        return Err(TesseraError::validation("frame size must be > 0"));
    }
    if tile_size == 0 {
        return Err(TesseraError::validation("tile size must be > 0"));
    }

    let tile_w = tile_size.min(width);
    let tile_h = tile_size.min(height);
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut data = vec![Rgba::TRANSPARENT; (width as usize) * (height as usize)];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let desc = TileDescriptor::new(width, height, tile_w, tile_h, tx, ty, border)?;
            let entry = cache.tile(graph, id, desc)?;
            for py in 0..tile_h {
                let gy = ty * tile_h + py;
                if gy >= height {
                    break;
                }
                for px in 0..tile_w {
                    let gx = tx * tile_w + px;
                    if gx >= width {
                        break;
                    }
                    data[(gy * width + gx) as usize] =
                        entry.sample_local(i64::from(px), i64::from(py));
                }
            }
        }
    }
    Ok(FrameRgba {
        width,
        height,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::filters::BrightnessContrast;
    use crate::channel::generators::Checker;
    use kurbo::Point;

    #[test]
    fn render_refuses_incomplete_and_degenerate() {
        let mut g = TextureGraph::new();
        let filt = g.add_node(Box::new(BrightnessContrast::new()), Point::ZERO);
        assert!(render_frame(&g, filt, 8, 8).is_err());

        let gen = g.add_node(Box::new(Checker::new()), Point::ZERO);
        assert!(render_frame(&g, gen, 0, 8).is_err());
        let mut cache = CacheTileManager::new();
        assert!(render_frame_tiled(&g, &mut cache, filt, 8, 8, 4, 0).is_err());
    }

    #[test]
    fn direct_and_tiled_agree_for_a_generator() {
        let mut g = TextureGraph::new();
        let gen = g.add_node(Box::new(Checker::new()), Point::ZERO);
        let mut cache = CacheTileManager::new();

        let direct = render_frame(&g, gen, 16, 16).unwrap();
        let tiled = render_frame_tiled(&g, &mut cache, gen, 16, 16, 8, 1).unwrap();
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(direct.get(x, y), tiled.get(x, y), "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn tiled_render_handles_non_divisible_sizes() {
        let mut g = TextureGraph::new();
        let gen = g.add_node(Box::new(Checker::new()), Point::ZERO);
        let mut cache = CacheTileManager::new();

        let direct = render_frame(&g, gen, 10, 6).unwrap();
        let tiled = render_frame_tiled(&g, &mut cache, gen, 10, 6, 4, 0).unwrap();
        assert_eq!(direct.data.len(), tiled.data.len());
        for (i, (a, b)) in direct.data.iter().zip(tiled.data.iter()).enumerate() {
            assert_eq!(a, b, "sample {i}");
        }
    }
}
