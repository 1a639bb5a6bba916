//! Pattern channels: zero-input generators.

use std::path::Path;

use crate::foundation::color::Rgba;
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::foundation::math::{hash_lattice, lerp, smoothstep, wrap_unit};

use super::params::{Gradient, ParamSet, ParamValue};
use super::{Channel, InputSource, OutputType};

/// Uniform color fill.
#[derive(Clone, Debug)]
pub struct ConstantColor {
    params: ParamSet,
}

impl ConstantColor {
    /// Opaque white by default.
    pub fn new() -> Self {
        Self {
            params: ParamSet::new().with_color("color", Rgba::WHITE),
        }
    }
}

impl Default for ConstantColor {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for ConstantColor {
    fn kind(&self) -> &'static str {
        "constant"
    }

    fn output_type(&self) -> OutputType {
        OutputType::Rgba
    }

    fn input_types(&self) -> &[OutputType] {
        &[]
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn value_rgba(&self, _inputs: &dyn InputSource, _u: f32, _v: f32) -> Rgba {
        self.params.color_or("color", Rgba::WHITE)
    }

    fn boxed_clone(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}

/// Checkerboard pattern.
#[derive(Clone, Debug)]
pub struct Checker {
    params: ParamSet,
}

impl Checker {
    /// 4x4 black/white squares by default.
    pub fn new() -> Self {
        Self {
            params: ParamSet::new()
                .with_int("squares_u", 4)
                .with_int("squares_v", 4)
                .with_color("color_a", Rgba::BLACK)
                .with_color("color_b", Rgba::WHITE),
        }
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for Checker {
    fn kind(&self) -> &'static str {
        "checker"
    }

    fn output_type(&self) -> OutputType {
        OutputType::Rgba
    }

    fn input_types(&self) -> &[OutputType] {
        &[]
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn value_rgba(&self, _inputs: &dyn InputSource, u: f32, v: f32) -> Rgba {
        let su = self.params.int_or("squares_u", 4).max(1);
        let sv = self.params.int_or("squares_v", 4).max(1);
        let ix = (wrap_unit(u) * su as f32).floor() as i64;
        let iy = (wrap_unit(v) * sv as f32).floor() as i64;
        if (ix + iy) % 2 == 0 {
            self.params.color_or("color_a", Rgba::BLACK)
        } else {
            self.params.color_or("color_b", Rgba::WHITE)
        }
    }

    fn boxed_clone(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}

/// Gradient ramp along `u` or `v`, colored by a gradient parameter.
#[derive(Clone, Debug)]
pub struct GradientRamp {
    params: ParamSet,
}

impl GradientRamp {
    /// Black-to-white ramp along `u` by default.
    pub fn new() -> Self {
        Self {
            params: ParamSet::new()
                .with(
                    "stops",
                    ParamValue::Gradient(Gradient::black_to_white()),
                )
                .with_enum("direction", 0, &["u", "v"]),
        }
    }
}

impl Default for GradientRamp {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for GradientRamp {
    fn kind(&self) -> &'static str {
        "gradient"
    }

    fn output_type(&self) -> OutputType {
        OutputType::Rgba
    }

    fn input_types(&self) -> &[OutputType] {
        &[]
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn value_rgba(&self, _inputs: &dyn InputSource, u: f32, v: f32) -> Rgba {
        let t = match self.params.enum_or("direction", 0) {
            1 => wrap_unit(v),
            _ => wrap_unit(u),
        };
        match self.params.get("stops") {
            Some(ParamValue::Gradient(g)) => g.sample(t),
            other => {
                tracing::error!(?other, "gradient parameter lookup failed");
                Rgba::gray(t)
            }
        }
    }

    fn boxed_clone(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}

/// Deterministic, seeded, tiling value noise (scalar output).
#[derive(Clone, Debug)]
pub struct ValueNoise {
    params: ParamSet,
}

impl ValueNoise {
    /// 8-cell lattice, one octave, seed 0 by default.
    pub fn new() -> Self {
        Self {
            params: ParamSet::new()
                .with_int("scale", 8)
                .with_int("octaves", 1)
                .with_float("persistence", 0.5)
                .with_int("seed", 0),
        }
    }

    fn octave(seed: u64, cells: i64, u: f32, v: f32) -> f32 {
        let fu = wrap_unit(u) * cells as f32;
        let fv = wrap_unit(v) * cells as f32;
        let ix = fu.floor() as i64;
        let iy = fv.floor() as i64;
        let tx = smoothstep(fu - ix as f32);
        let ty = smoothstep(fv - iy as f32);

        // Lattice wraps modulo the cell count so the noise tiles.
        let corner = |dx: i64, dy: i64| -> f32 {
            let cx = (ix + dx).rem_euclid(cells);
            let cy = (iy + dy).rem_euclid(cells);
            let h = hash_lattice(seed, cx, cy);
            (h >> 40) as f32 / ((1u64 << 24) as f32)
        };

        let top = lerp(corner(0, 0), corner(1, 0), tx);
        let bottom = lerp(corner(0, 1), corner(1, 1), tx);
        lerp(top, bottom, ty)
    }
}

impl Default for ValueNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for ValueNoise {
    fn kind(&self) -> &'static str {
        "noise"
    }

    fn output_type(&self) -> OutputType {
        OutputType::Scalar
    }

    fn input_types(&self) -> &[OutputType] {
        &[]
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn value_rgba(&self, _inputs: &dyn InputSource, u: f32, v: f32) -> Rgba {
        let scale = self.params.int_or("scale", 8).max(1);
        let octaves = self.params.int_or("octaves", 1).clamp(1, 8);
        let persistence = self.params.float_or("persistence", 0.5);
        let seed = self.params.int_or("seed", 0) as u64;

        let mut sum = 0.0f32;
        let mut amplitude = 1.0f32;
        let mut total = 0.0f32;
        for octave in 0..octaves {
            let cells = scale << octave;
            sum += amplitude * Self::octave(seed.wrapping_add(octave as u64), cells, u, v);
            total += amplitude;
            amplitude *= persistence;
        }
        Rgba::gray(sum / total.max(f32::MIN_POSITIVE))
    }

    fn boxed_clone(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}

#[derive(Clone, Debug)]
struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

/// Raster image source; decodes in [`Channel::prepare`], samples nearest.
#[derive(Clone, Debug)]
pub struct BitmapSource {
    params: ParamSet,
    decoded: Option<DecodedImage>,
}

impl BitmapSource {
    /// Unconfigured bitmap source (empty path).
    pub fn new() -> Self {
        Self {
            params: ParamSet::new().with("source", ParamValue::Image(String::new())),
            decoded: None,
        }
    }
}

impl Default for BitmapSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for BitmapSource {
    fn kind(&self) -> &'static str {
        "bitmap"
    }

    fn output_type(&self) -> OutputType {
        OutputType::Rgba
    }

    fn input_types(&self) -> &[OutputType] {
        &[]
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn value_rgba(&self, _inputs: &dyn InputSource, u: f32, v: f32) -> Rgba {
        let Some(img) = &self.decoded else {
            tracing::error!("bitmap source sampled before prepare()");
            return Rgba::TRANSPARENT;
        };
        let x = ((wrap_unit(u) * img.width as f32) as u32).min(img.width - 1);
        let y = ((wrap_unit(v) * img.height as f32) as u32).min(img.height - 1);
        img.pixels[(y * img.width + x) as usize]
    }

    fn prepare(&mut self, assets_root: &Path) -> TesseraResult<()> {
        let source = self.params.text_or_empty("source");
        if source.is_empty() {
            return Err(TesseraError::validation("bitmap source path is empty"));
        }
        let path = assets_root.join(&source);
        let img = image::open(&path)
            .map_err(|e| {
                TesseraError::validation(format!("decode '{}': {e}", path.display()))
            })?
            .to_rgba8();
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(TesseraError::validation("bitmap has zero dimension"));
        }
        let pixels = img
            .pixels()
            .map(|p| {
                Rgba::new(
                    f32::from(p.0[0]) / 255.0,
                    f32::from(p.0[1]) / 255.0,
                    f32::from(p.0[2]) / 255.0,
                    f32::from(p.0[3]) / 255.0,
                )
            })
            .collect();
        self.decoded = Some(DecodedImage {
            width,
            height,
            pixels,
        });
        Ok(())
    }

    fn boxed_clone(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::NoInputs;

    #[test]
    fn checker_alternates_squares() {
        let c = Checker::new();
        let a = c.value_rgba(&NoInputs, 0.1, 0.1);
        let b = c.value_rgba(&NoInputs, 0.35, 0.1);
        assert_eq!(a, Rgba::BLACK);
        assert_eq!(b, Rgba::WHITE);
        // Two squares over in both axes lands on the same color again.
        assert_eq!(c.value_rgba(&NoInputs, 0.6, 0.6), a);
    }

    #[test]
    fn gradient_ramp_follows_direction() {
        let mut g = GradientRamp::new();
        assert!(g.value_rgba(&NoInputs, 0.9, 0.0).r > 0.8);
        g.params_mut().set_enum("direction", 1).unwrap();
        assert!(g.value_rgba(&NoInputs, 0.9, 0.0).r < 0.1);
    }

    #[test]
    fn noise_is_deterministic_and_in_range() {
        let n = ValueNoise::new();
        for i in 0..32 {
            let u = i as f32 / 32.0;
            let s = n.value_rgba(&NoInputs, u, u * 0.5);
            let s2 = n.value_rgba(&NoInputs, u, u * 0.5);
            assert_eq!(s, s2);
            assert!((0.0..=1.0).contains(&s.r), "noise out of range: {}", s.r);
            assert_eq!(s.r, s.g);
            assert_eq!(s.a, 1.0);
        }
    }

    #[test]
    fn noise_seed_changes_pattern() {
        let a = ValueNoise::new();
        let mut b = ValueNoise::new();
        b.params_mut().set_int("seed", 17).unwrap();
        let mut differs = false;
        for i in 0..16 {
            let u = i as f32 / 16.0 + 0.01;
            if a.value_rgba(&NoInputs, u, 0.3) != b.value_rgba(&NoInputs, u, 0.3) {
                differs = true;
                break;
            }
        }
        assert!(differs);
    }

    #[test]
    fn noise_tiles_at_unit_boundaries() {
        let n = ValueNoise::new();
        for i in 0..8 {
            let v = i as f32 / 8.0;
            let at0 = n.value_rgba(&NoInputs, 0.0, v);
            let at1 = n.value_rgba(&NoInputs, 1.0, v);
            assert!(at0.max_abs_diff(at1) < 1e-5);
        }
    }

    #[test]
    fn unprepared_bitmap_yields_degenerate_sample() {
        let b = BitmapSource::new();
        assert_eq!(b.value_rgba(&NoInputs, 0.5, 0.5), Rgba::TRANSPARENT);
    }

    #[test]
    fn bitmap_prepare_fails_on_empty_path() {
        let mut b = BitmapSource::new();
        assert!(b.prepare(Path::new(".")).is_err());
    }
}
