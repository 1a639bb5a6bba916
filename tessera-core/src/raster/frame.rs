use crate::foundation::color::Rgba;

/// A rendered raster of RGBA `f32` samples, row-major.
#[derive(Clone, Debug)]
pub struct FrameRgba {
    /// Raster width in pixels.
    pub width: u32,
    /// Raster height in pixels.
    pub height: u32,
    /// Samples, `width * height`, row-major top-down.
    pub data: Vec<Rgba>,
}

impl FrameRgba {
    /// Sample at pixel (x, y); out-of-range coordinates are a programmer
    /// error and panic like slice indexing.
    pub fn get(&self, x: u32, y: u32) -> Rgba {
        assert!(x < self.width && y < self.height, "pixel out of range");
        self.data[(y * self.width + x) as usize]
    }

    /// Convert to 8-bit straight-alpha RGBA bytes, clamped.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * 4);
        for px in &self.data {
            out.extend_from_slice(&px.to_rgba8());
        }
        out
    }

    /// Convert to 8-bit grayscale via luminance, clamped.
    pub fn to_gray8(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|px| (px.luminance().clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }

    /// Convert to 8-bit grayscale from the alpha channel.
    pub fn alpha_to_gray8(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|px| (px.a.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }
}
