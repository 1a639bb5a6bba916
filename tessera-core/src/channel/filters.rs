//! Filter channels: one or more inputs.
//!
//! Filters never wrap coordinates themselves; they hand possibly
//! out-of-range coordinates to [`InputSource::sample`], which wraps. That
//! keeps neighborhood reads (blur, derivatives) seam-correct on the tiling
//! texture plane in both the direct and the tile-backed path.

use crate::foundation::color::Rgba;

use super::params::ParamSet;
use super::{derivative_u, derivative_v, Channel, InputSource, OutputType};

/// Brightness/contrast adjustment (pointwise, 1 input).
#[derive(Clone, Debug)]
pub struct BrightnessContrast {
    params: ParamSet,
}

impl BrightnessContrast {
    /// Identity adjustment by default.
    pub fn new() -> Self {
        Self {
            params: ParamSet::new()
                .with_float("brightness", 0.0)
                .with_float("contrast", 1.0),
        }
    }
}

impl Default for BrightnessContrast {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for BrightnessContrast {
    fn kind(&self) -> &'static str {
        "brightness"
    }

    fn output_type(&self) -> OutputType {
        OutputType::Rgba
    }

    fn input_types(&self) -> &[OutputType] {
        &[OutputType::Rgba]
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn value_rgba(&self, inputs: &dyn InputSource, u: f32, v: f32) -> Rgba {
        let brightness = self.params.float_or("brightness", 0.0);
        let contrast = self.params.float_or("contrast", 1.0);
        let c = inputs.sample(0, u, v);
        let adjust = |x: f32| (x - 0.5) * contrast + 0.5 + brightness;
        Rgba::new(adjust(c.r), adjust(c.g), adjust(c.b), c.a)
    }

    fn boxed_clone(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}

/// Two-input combine with a mode parameter (pointwise).
///
/// Slot 0 is the base layer, slot 1 the layer blended on top.
#[derive(Clone, Debug)]
pub struct Blend {
    params: ParamSet,
}

impl Blend {
    /// Mix mode at full opacity by default.
    pub fn new() -> Self {
        Self {
            params: ParamSet::new()
                .with_enum("mode", 0, &["mix", "add", "multiply", "screen"])
                .with_float("opacity", 1.0),
        }
    }
}

impl Default for Blend {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for Blend {
    fn kind(&self) -> &'static str {
        "blend"
    }

    fn output_type(&self) -> OutputType {
        OutputType::Rgba
    }

    fn input_types(&self) -> &[OutputType] {
        &[OutputType::Rgba, OutputType::Rgba]
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn value_rgba(&self, inputs: &dyn InputSource, u: f32, v: f32) -> Rgba {
        let base = inputs.sample(0, u, v);
        let layer = inputs.sample(1, u, v);
        let blended = match self.params.enum_or("mode", 0) {
            1 => base + layer,
            2 => base.mul_components(layer),
            3 => {
                let screen = |a: f32, b: f32| 1.0 - (1.0 - a) * (1.0 - b);
                Rgba::new(
                    screen(base.r, layer.r),
                    screen(base.g, layer.g),
                    screen(base.b, layer.b),
                    screen(base.a, layer.a),
                )
            }
            _ => layer,
        };
        let opacity = self.params.float_or("opacity", 1.0).clamp(0.0, 1.0);
        base.lerp(blended, opacity)
    }

    fn boxed_clone(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}

/// Box blur over an NxN sample grid (neighborhood, 1 input).
#[derive(Clone, Debug)]
pub struct BoxBlur {
    params: ParamSet,
}

impl BoxBlur {
    /// 3x3 grid with a small radius by default.
    pub fn new() -> Self {
        Self {
            params: ParamSet::new()
                .with_float("radius", 1.0 / 64.0)
                .with_int("grid", 3),
        }
    }
}

impl Default for BoxBlur {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for BoxBlur {
    fn kind(&self) -> &'static str {
        "blur"
    }

    fn output_type(&self) -> OutputType {
        OutputType::Rgba
    }

    fn input_types(&self) -> &[OutputType] {
        &[OutputType::Rgba]
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn value_rgba(&self, inputs: &dyn InputSource, u: f32, v: f32) -> Rgba {
        let radius = self.params.float_or("radius", 1.0 / 64.0).max(0.0);
        let grid = self.params.int_or("grid", 3).clamp(1, 15);
        if grid == 1 || radius == 0.0 {
            return inputs.sample(0, u, v);
        }

        let mut acc = Rgba::TRANSPARENT;
        let step = 2.0 * radius / (grid - 1) as f32;
        for gy in 0..grid {
            let dv = -radius + gy as f32 * step;
            for gx in 0..grid {
                let du = -radius + gx as f32 * step;
                acc = acc + inputs.sample(0, u + du, v + dv);
            }
        }
        acc * (1.0 / (grid * grid) as f32)
    }

    fn boxed_clone(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}

/// Affine coordinate warp (resampling, 1 input).
///
/// Rotation and scale are applied about the texture center (0.5, 0.5),
/// then the offset is added. The transformed coordinate is handed to the
/// input source unwrapped.
#[derive(Clone, Debug)]
pub struct AffineWarp {
    params: ParamSet,
}

impl AffineWarp {
    /// Identity warp by default.
    pub fn new() -> Self {
        Self {
            params: ParamSet::new()
                .with_float("scale_u", 1.0)
                .with_float("scale_v", 1.0)
                .with_float("rotate_deg", 0.0)
                .with_float("offset_u", 0.0)
                .with_float("offset_v", 0.0),
        }
    }
}

impl Default for AffineWarp {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for AffineWarp {
    fn kind(&self) -> &'static str {
        "warp"
    }

    fn output_type(&self) -> OutputType {
        OutputType::Rgba
    }

    fn input_types(&self) -> &[OutputType] {
        &[OutputType::Rgba]
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn value_rgba(&self, inputs: &dyn InputSource, u: f32, v: f32) -> Rgba {
        let scale_u = f64::from(self.params.float_or("scale_u", 1.0));
        let scale_v = f64::from(self.params.float_or("scale_v", 1.0));
        let rotate = f64::from(self.params.float_or("rotate_deg", 0.0)).to_radians();
        let offset_u = f64::from(self.params.float_or("offset_u", 0.0));
        let offset_v = f64::from(self.params.float_or("offset_v", 0.0));

        let affine = kurbo::Affine::translate((0.5 + offset_u, 0.5 + offset_v))
            * kurbo::Affine::rotate(rotate)
            * kurbo::Affine::scale_non_uniform(scale_u, scale_v)
            * kurbo::Affine::translate((-0.5, -0.5));
        let p = affine * kurbo::Point::new(f64::from(u), f64::from(v));
        inputs.sample(0, p.x as f32, p.y as f32)
    }

    fn boxed_clone(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}

/// Tangent-space normal map from the input's height (derivative consumer).
#[derive(Clone, Debug)]
pub struct NormalMap {
    params: ParamSet,
}

impl NormalMap {
    /// Unit strength by default.
    pub fn new() -> Self {
        Self {
            params: ParamSet::new().with_float("strength", 1.0),
        }
    }
}

impl Default for NormalMap {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for NormalMap {
    fn kind(&self) -> &'static str {
        "normalmap"
    }

    fn output_type(&self) -> OutputType {
        OutputType::Rgba
    }

    fn input_types(&self) -> &[OutputType] {
        &[OutputType::Scalar]
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn value_rgba(&self, inputs: &dyn InputSource, u: f32, v: f32) -> Rgba {
        let strength = self.params.float_or("strength", 1.0);
        let dx = derivative_u(inputs, 0, u, v).luminance() * strength;
        let dy = derivative_v(inputs, 0, u, v).luminance() * strength;
        let len = (dx * dx + dy * dy + 1.0).sqrt();
        let (nx, ny, nz) = (-dx / len, -dy / len, 1.0 / len);
        Rgba::new(nx * 0.5 + 0.5, ny * 0.5 + 0.5, nz * 0.5 + 0.5, 1.0)
    }

    fn boxed_clone(&self) -> Box<dyn Channel> {
        Box::new(self.clone())
    }
}
