//! The channel (operator) evaluation contract and the built-in channels.

pub mod filters;
pub mod generators;
pub mod params;
pub mod registry;

use std::path::Path;

use crate::foundation::color::Rgba;
use crate::foundation::error::TesseraResult;

use self::params::ParamSet;

/// Finite-difference step used by [`derivative_u`] / [`derivative_v`].
pub const DERIVATIVE_STEP: f32 = 1.0 / (4.0 * 256.0);

/// Output sample type declared per channel kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OutputType {
    /// Grayscale output; r/g/b carry the value, alpha is 1.
    Scalar,
    /// Full four-component color output.
    Rgba,
}

/// Resolved input samples handed to [`Channel::value_rgba`].
///
/// The same channel body runs against two implementations: the direct path
/// recursively evaluates upstream channels per sample, the tiled path reads
/// neighbor samples out of already-computed cache tiles. Keeping the contract
/// behind this trait is what makes the cache a pure optimization.
pub trait InputSource {
    /// Number of input slots available to the channel being evaluated.
    fn arity(&self) -> usize;

    /// Sample input `slot` at (wrapped) normalized coordinates.
    ///
    /// Sampling a slot at or beyond [`InputSource::arity`] is a contract
    /// violation: it is logged at error severity and yields transparent
    /// black rather than silently aliasing another input. Sampling an
    /// unwired slot panics; callers gate evaluation on graph completeness.
    fn sample(&self, slot: usize, u: f32, v: f32) -> Rgba;
}

/// Forward finite-difference derivative of an input along `u`.
///
/// `(f(u+d, v) - f(u, v)) * (1/d)` with `d = 1/(4*256)`; the reciprocal-step
/// scaling is part of the contract that relief-style channels rely on.
pub fn derivative_u(src: &dyn InputSource, slot: usize, u: f32, v: f32) -> Rgba {
    (src.sample(slot, u + DERIVATIVE_STEP, v) - src.sample(slot, u, v)) * (1.0 / DERIVATIVE_STEP)
}

/// Forward finite-difference derivative of an input along `v`.
pub fn derivative_v(src: &dyn InputSource, slot: usize, u: f32, v: f32) -> Rgba {
    (src.sample(slot, u, v + DERIVATIVE_STEP) - src.sample(slot, u, v)) * (1.0 / DERIVATIVE_STEP)
}

/// A texture operator: a pure function of coordinates, parameters and
/// resolved input samples.
///
/// Channels carry mutable parameter state but no evaluation state; given
/// fixed parameters and inputs, [`Channel::value_rgba`] is deterministic.
pub trait Channel: Send + Sync {
    /// Stable kind tag; also the factory name used by the text format.
    fn kind(&self) -> &'static str;

    /// Declared output type of this channel kind.
    fn output_type(&self) -> OutputType;

    /// Declared per-slot input types; the length is the input arity.
    fn input_types(&self) -> &[OutputType];

    /// The channel's parameter set.
    fn params(&self) -> &ParamSet;

    /// Mutable access to the parameter set.
    ///
    /// Interactive edits go through [`crate::TextureGraph::set_param`] so the
    /// owning node's change version stays truthful; direct access is for
    /// bulk configuration of channels not yet in a graph (the loader).
    fn params_mut(&mut self) -> &mut ParamSet;

    /// Evaluate the channel at normalized coordinates in `[0, 1)`.
    fn value_rgba(&self, inputs: &dyn InputSource, u: f32, v: f32) -> Rgba;

    /// Front-load any external IO this channel needs before evaluation.
    ///
    /// Renderers never touch the filesystem; channels that reference files
    /// (the bitmap source) decode here, everything else is a no-op.
    fn prepare(&mut self, _assets_root: &Path) -> TesseraResult<()> {
        Ok(())
    }

    /// Deep-clone the channel including its full parameter state.
    fn boxed_clone(&self) -> Box<dyn Channel>;
}

impl Clone for Box<dyn Channel> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

impl std::fmt::Debug for dyn Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel").field("kind", &self.kind()).finish()
    }
}

/// Input source for evaluating generators standalone; any sample call is
/// a contract violation (logged, degenerate).
pub struct NoInputs;

impl InputSource for NoInputs {
    fn arity(&self) -> usize {
        0
    }

    fn sample(&self, slot: usize, _u: f32, _v: f32) -> Rgba {
        tracing::error!(slot, "input sample requested from a zero-input channel");
        Rgba::TRANSPARENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::generators::Checker;

    struct Constant(Rgba);

    impl InputSource for Constant {
        fn arity(&self) -> usize {
            1
        }

        fn sample(&self, _slot: usize, _u: f32, _v: f32) -> Rgba {
            self.0
        }
    }

    #[test]
    fn derivative_of_constant_input_is_zero() {
        let src = Constant(Rgba::new(0.3, 0.4, 0.5, 1.0));
        let du = derivative_u(&src, 0, 0.25, 0.25);
        let dv = derivative_v(&src, 0, 0.25, 0.25);
        assert_eq!(du, Rgba::new(0.0, 0.0, 0.0, 0.0));
        assert_eq!(dv, Rgba::new(0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn derivative_scales_by_reciprocal_step() {
        struct Ramp;
        impl InputSource for Ramp {
            fn arity(&self) -> usize {
                1
            }
            fn sample(&self, _slot: usize, u: f32, _v: f32) -> Rgba {
                Rgba::gray(u)
            }
        }
        // d/du of a unit ramp is 1 regardless of the step size.
        let du = derivative_u(&Ramp, 0, 0.25, 0.0);
        assert!((du.r - 1.0).abs() < 1e-3, "du.r = {}", du.r);
    }

    #[test]
    fn boxed_clone_preserves_parameters() {
        let mut c: Box<dyn Channel> = Box::new(Checker::new());
        c.params_mut().set_int("squares_u", 7).unwrap();
        let d = c.clone();
        assert_eq!(d.params().int_or("squares_u", 0), 7);
        assert_eq!(d.kind(), "checker");
    }
}
