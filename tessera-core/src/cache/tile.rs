use crate::channel::{Channel, InputSource};
use crate::foundation::color::Rgba;
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::foundation::math::wrap_unit;

/// Resolution descriptor of one cached tile.
///
/// Cache keys compare all seven fields; the same tile position at a
/// different global resolution or border width is a different entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TileDescriptor {
    /// Full raster width in pixels.
    pub global_w: u32,
    /// Full raster height in pixels.
    pub global_h: u32,
    /// Tile width in pixels (without border).
    pub tile_w: u32,
    /// Tile height in pixels (without border).
    pub tile_h: u32,
    /// Tile column in the tile grid.
    pub tile_x: u32,
    /// Tile row in the tile grid.
    pub tile_y: u32,
    /// Extra samples computed around every tile edge so neighborhood
    /// filters can read past the boundary without a cache miss.
    pub border: u32,
}

impl TileDescriptor {
    /// Build a descriptor, validating dimensions.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        global_w: u32,
        global_h: u32,
        tile_w: u32,
        tile_h: u32,
        tile_x: u32,
        tile_y: u32,
        border: u32,
    ) -> TesseraResult<Self> {
        if global_w == 0 || global_h == 0 {
            return Err(TesseraError::validation("global size must be > 0"));
        }
        if tile_w == 0 || tile_h == 0 {
            return Err(TesseraError::validation("tile size must be > 0"));
        }
        if tile_w > global_w || tile_h > global_h {
            return Err(TesseraError::validation(
                "tile size must not exceed global size",
            ));
        }
        Ok(Self {
            global_w,
            global_h,
            tile_w,
            tile_h,
            tile_x,
            tile_y,
            border,
        })
    }

    /// One tile covering the whole raster.
    pub fn single(global_w: u32, global_h: u32, border: u32) -> TesseraResult<Self> {
        Self::new(global_w, global_h, global_w, global_h, 0, 0, border)
    }

    /// Global x of the tile's left edge.
    pub fn origin_x(&self) -> i64 {
        i64::from(self.tile_x) * i64::from(self.tile_w)
    }

    /// Global y of the tile's top edge.
    pub fn origin_y(&self) -> i64 {
        i64::from(self.tile_y) * i64::from(self.tile_h)
    }

    fn padded_w(&self) -> usize {
        (self.tile_w + 2 * self.border) as usize
    }

    fn padded_h(&self) -> usize {
        (self.tile_h + 2 * self.border) as usize
    }
}

/// One materialized tile of RGBA samples for one channel.
///
/// Samples cover `[-border, tile_w + border) x [-border, tile_h + border)`
/// in tile-local pixel coordinates. Entries start dirty; `compute` fills
/// the buffer only while stale.
#[derive(Clone, Debug)]
pub struct TileCacheEntry {
    desc: TileDescriptor,
    samples: Vec<Rgba>,
    dirty: bool,
    fingerprint: u64,
    last_used: u64,
}

impl TileCacheEntry {
    pub(crate) fn new(desc: TileDescriptor) -> Self {
        Self {
            desc,
            samples: vec![Rgba::TRANSPARENT; desc.padded_w() * desc.padded_h()],
            dirty: true,
            fingerprint: 0,
            last_used: 0,
        }
    }

    /// The entry's resolution descriptor.
    pub fn descriptor(&self) -> &TileDescriptor {
        &self.desc
    }

    /// True while the stored samples are stale.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub(crate) fn last_used(&self) -> u64 {
        self.last_used
    }

    pub(crate) fn set_last_used(&mut self, clock: u64) {
        self.last_used = clock;
    }

    /// Read a sample at tile-local pixel coordinates; coordinates are
    /// clamped into the bordered region.
    pub fn sample_local(&self, px: i64, py: i64) -> Rgba {
        let b = i64::from(self.desc.border);
        let x = px.clamp(-b, i64::from(self.desc.tile_w) + b - 1);
        let y = py.clamp(-b, i64::from(self.desc.tile_h) + b - 1);
        let idx = (y + b) as usize * self.desc.padded_w() + (x + b) as usize;
        self.samples[idx]
    }

    /// Read the sample nearest to normalized coordinates (u, v).
    ///
    /// Coordinates wrap into `[0, 1)` first. A global pixel outside this
    /// tile's bordered region is first re-mapped across the wrap seam
    /// (border samples at raster edges hold wrapped content), then clamped.
    pub fn sample_uv(&self, u: f32, v: f32) -> Rgba {
        let d = &self.desc;
        let gw = i64::from(d.global_w);
        let gh = i64::from(d.global_h);
        let gx = ((wrap_unit(u) * d.global_w as f32).floor() as i64).min(gw - 1);
        let gy = ((wrap_unit(v) * d.global_h as f32).floor() as i64).min(gh - 1);

        let b = i64::from(d.border);
        let (tw, th) = (i64::from(d.tile_w), i64::from(d.tile_h));
        let mut lx = gx - d.origin_x();
        let mut ly = gy - d.origin_y();
        if lx < -b {
            lx += gw;
        } else if lx >= tw + b {
            lx -= gw;
        }
        if ly < -b {
            ly += gh;
        } else if ly >= th + b {
            ly -= gh;
        }
        self.sample_local(lx, ly)
    }

    /// Fill the buffer if stale: every sample in the bordered region is
    /// evaluated at its wrapped global pixel center, reading inputs (if
    /// any) out of the supplied neighbor tiles. Clears the dirty flag.
    pub(crate) fn compute(
        &mut self,
        channel: &dyn Channel,
        inputs: &[Option<&TileCacheEntry>],
        fingerprint: u64,
    ) {
        if !self.dirty && self.fingerprint == fingerprint {
            return;
        }
        let d = self.desc;
        let b = i64::from(d.border);
        let src = TileInputs { entries: inputs };
        let mut idx = 0usize;
        for py in -b..(i64::from(d.tile_h) + b) {
            for px in -b..(i64::from(d.tile_w) + b) {
                let gx = d.origin_x() + px;
                let gy = d.origin_y() + py;
                let u = wrap_unit((gx as f32 + 0.5) / d.global_w as f32);
                let v = wrap_unit((gy as f32 + 0.5) / d.global_h as f32);
                self.samples[idx] = channel.value_rgba(&src, u, v);
                idx += 1;
            }
        }
        self.dirty = false;
        self.fingerprint = fingerprint;
    }
}

/// Tile-backed input source: reads neighbor samples out of already
/// computed input tiles instead of re-evaluating upstream subgraphs.
struct TileInputs<'a> {
    entries: &'a [Option<&'a TileCacheEntry>],
}

impl InputSource for TileInputs<'_> {
    fn arity(&self) -> usize {
        self.entries.len()
    }

    fn sample(&self, slot: usize, u: f32, v: f32) -> Rgba {
        let Some(entry) = self.entries.get(slot) else {
            tracing::error!(slot, "tile input sample beyond declared arity");
            return Rgba::TRANSPARENT;
        };
        let Some(entry) = entry else {
            panic!(
                "evaluated unwired input slot {slot} from a cache tile; \
                 check completeness before evaluation"
            );
        };
        entry.sample_uv(u, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::generators::Checker;

    #[test]
    fn descriptor_rejects_degenerate_sizes() {
        assert!(TileDescriptor::new(0, 16, 8, 8, 0, 0, 0).is_err());
        assert!(TileDescriptor::new(16, 16, 0, 8, 0, 0, 0).is_err());
        assert!(TileDescriptor::new(16, 16, 32, 8, 0, 0, 0).is_err());
        assert!(TileDescriptor::new(16, 16, 8, 8, 1, 1, 2).is_ok());
    }

    #[test]
    fn entry_starts_dirty_and_computes_once() {
        let desc = TileDescriptor::single(8, 8, 1).unwrap();
        let mut entry = TileCacheEntry::new(desc);
        assert!(entry.is_dirty());

        let checker = Checker::new();
        entry.compute(&checker, &[], 42);
        assert!(!entry.is_dirty());
        assert_eq!(entry.fingerprint(), 42);
    }

    #[test]
    fn computed_samples_match_direct_generator_output() {
        let desc = TileDescriptor::new(16, 16, 8, 8, 1, 0, 2).unwrap();
        let mut entry = TileCacheEntry::new(desc);
        let checker = Checker::new();
        entry.compute(&checker, &[], 1);

        use crate::channel::NoInputs;
        for py in -2i64..10 {
            for px in -2i64..10 {
                let gx = desc.origin_x() + px;
                let gy = desc.origin_y() + py;
                let u = wrap_unit((gx as f32 + 0.5) / 16.0);
                let v = wrap_unit((gy as f32 + 0.5) / 16.0);
                let direct = checker.value_rgba(&NoInputs, u, v);
                assert_eq!(entry.sample_local(px, py), direct, "at ({px}, {py})");
            }
        }
    }

    #[test]
    fn sample_uv_maps_across_the_wrap_seam() {
        // Tile at the left raster edge: its left border column holds
        // wrapped right-edge content, so a sample from the raster's far
        // right must map back into that border instead of being clamped
        // onto the tile's left interior.
        let desc = TileDescriptor::new(16, 16, 8, 8, 0, 0, 1).unwrap();
        let mut entry = TileCacheEntry::new(desc);
        let checker = Checker::new();
        entry.compute(&checker, &[], 1);

        use crate::channel::NoInputs;
        let far_right_u = 15.5 / 16.0;
        let direct = checker.value_rgba(&NoInputs, far_right_u, 0.5 / 16.0);
        assert_eq!(entry.sample_uv(far_right_u, 0.5 / 16.0), direct);
        assert_eq!(
            entry.sample_uv(far_right_u, 0.5 / 16.0),
            entry.sample_local(-1, 0)
        );
    }
}
