//! Channel factory keyed by kind name, used by the loader and editors.

use super::filters::{AffineWarp, Blend, BoxBlur, BrightnessContrast, NormalMap};
use super::generators::{BitmapSource, Checker, ConstantColor, GradientRamp, ValueNoise};
use super::Channel;

/// All registered kind names, in a stable order.
pub const KINDS: &[&str] = &[
    "constant",
    "checker",
    "gradient",
    "noise",
    "bitmap",
    "brightness",
    "blend",
    "blur",
    "warp",
    "normalmap",
];

/// Construct a channel of the given kind with default parameters.
///
/// Returns `None` for unknown kinds; the loader turns that into a hard
/// parse failure.
pub fn create(kind: &str) -> Option<Box<dyn Channel>> {
    let ch: Box<dyn Channel> = match kind {
        "constant" => Box::new(ConstantColor::new()),
        "checker" => Box::new(Checker::new()),
        "gradient" => Box::new(GradientRamp::new()),
        "noise" => Box::new(ValueNoise::new()),
        "bitmap" => Box::new(BitmapSource::new()),
        "brightness" => Box::new(BrightnessContrast::new()),
        "blend" => Box::new(Blend::new()),
        "blur" => Box::new(BoxBlur::new()),
        "warp" => Box::new(AffineWarp::new()),
        "normalmap" => Box::new(NormalMap::new()),
        _ => return None,
    };
    Some(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registered_kind_constructs_under_its_own_name() {
        for kind in KINDS {
            let ch = create(kind).unwrap_or_else(|| panic!("kind '{kind}' missing"));
            assert_eq!(ch.kind(), *kind);
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(create("perlin_marble_ultra").is_none());
    }
}
