//! Typed, named channel parameters.
//!
//! Parameters are the only mutable state a channel carries. Each value is
//! one of a closed set of types; the text format serializes every value
//! behind a one-word type tag so unknown parameter names can be skipped
//! without understanding them.

use crate::foundation::color::Rgba;
use crate::foundation::error::{TesseraError, TesseraResult};

/// A color gradient: stops sorted by position in `[0, 1]`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Gradient {
    stops: Vec<(f32, Rgba)>,
}

impl Gradient {
    /// Build a gradient from stops; stops are sorted by position.
    pub fn new(mut stops: Vec<(f32, Rgba)>) -> TesseraResult<Self> {
        if stops.is_empty() {
            return Err(TesseraError::validation(
                "gradient needs at least one stop",
            ));
        }
        for (pos, _) in &stops {
            if !pos.is_finite() {
                return Err(TesseraError::validation("gradient stop must be finite"));
            }
        }
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self { stops })
    }

    /// Two-stop gradient from black to white.
    pub fn black_to_white() -> Self {
        Self {
            stops: vec![(0.0, Rgba::BLACK), (1.0, Rgba::WHITE)],
        }
    }

    /// The sorted stop list.
    pub fn stops(&self) -> &[(f32, Rgba)] {
        &self.stops
    }

    /// Piecewise-linear sample at `t`; clamps outside the stop range.
    pub fn sample(&self, t: f32) -> Rgba {
        let first = self.stops[0];
        if t <= first.0 {
            return first.1;
        }
        for pair in self.stops.windows(2) {
            let (p0, c0) = pair[0];
            let (p1, c1) = pair[1];
            if t <= p1 {
                let span = p1 - p0;
                if span <= 0.0 {
                    return c1;
                }
                return c0.lerp(c1, (t - p0) / span);
            }
        }
        self.stops[self.stops.len() - 1].1
    }
}

/// A parameter value of one of the supported types.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ParamValue {
    /// Scalar float.
    Float(f32),
    /// Integer.
    Int(i64),
    /// Boolean toggle.
    Bool(bool),
    /// Index into a fixed option list declared by the channel.
    Enum {
        /// Selected option index.
        index: usize,
        /// Option labels; fixed per channel kind, not serialized by value.
        options: Vec<String>,
    },
    /// RGBA color.
    Color(Rgba),
    /// Color gradient.
    Gradient(Gradient),
    /// Row-major 3x3 matrix.
    Matrix([f32; 9]),
    /// Free-form text.
    Text(String),
    /// Relative path to an image file.
    Image(String),
}

impl ParamValue {
    /// One-word tag written ahead of the value tokens in the text format.
    pub fn type_tag(&self) -> &'static str {
        match self {
            ParamValue::Float(_) => "float",
            ParamValue::Int(_) => "int",
            ParamValue::Bool(_) => "bool",
            ParamValue::Enum { .. } => "enum",
            ParamValue::Color(_) => "color",
            ParamValue::Gradient(_) => "gradient",
            ParamValue::Matrix(_) => "matrix",
            ParamValue::Text(_) => "text",
            ParamValue::Image(_) => "image",
        }
    }
}

/// A named parameter.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Param {
    /// Parameter name; serialized with spaces replaced by underscores.
    pub name: String,
    /// Current value.
    pub value: ParamValue,
}

/// Ordered collection of a channel's parameters.
///
/// Lookups are linear; channels declare a handful of parameters at most.
/// Setters enforce that the value type matches the declared type, so a
/// parameter never changes type after construction.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParamSet {
    params: Vec<Param>,
}

impl ParamSet {
    /// Empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter (builder style, used by channel constructors).
    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            value,
        });
        self
    }

    /// Declare a float parameter.
    pub fn with_float(self, name: &str, value: f32) -> Self {
        self.with(name, ParamValue::Float(value))
    }

    /// Declare an int parameter.
    pub fn with_int(self, name: &str, value: i64) -> Self {
        self.with(name, ParamValue::Int(value))
    }

    /// Declare a bool parameter.
    pub fn with_bool(self, name: &str, value: bool) -> Self {
        self.with(name, ParamValue::Bool(value))
    }

    /// Declare an enum parameter with its option labels.
    pub fn with_enum(self, name: &str, index: usize, options: &[&str]) -> Self {
        self.with(
            name,
            ParamValue::Enum {
                index,
                options: options.iter().map(|s| s.to_string()).collect(),
            },
        )
    }

    /// Declare a color parameter.
    pub fn with_color(self, name: &str, value: Rgba) -> Self {
        self.with(name, ParamValue::Color(value))
    }

    /// All parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// True when no parameters are declared.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Replace a parameter's value; the new value must match the declared
    /// type (same variant), and enum indices must be in range.
    pub fn set(&mut self, name: &str, value: ParamValue) -> TesseraResult<()> {
        let param = self
            .params
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| TesseraError::validation(format!("unknown parameter '{name}'")))?;
        match (&mut param.value, value) {
            (ParamValue::Float(slot), ParamValue::Float(v)) => *slot = v,
            (ParamValue::Int(slot), ParamValue::Int(v)) => *slot = v,
            (ParamValue::Bool(slot), ParamValue::Bool(v)) => *slot = v,
            (ParamValue::Enum { index, options }, ParamValue::Enum { index: v, .. }) => {
                if v >= options.len() {
                    return Err(TesseraError::validation(format!(
                        "enum index {v} out of range for parameter '{name}'"
                    )));
                }
                *index = v;
            }
            (ParamValue::Color(slot), ParamValue::Color(v)) => *slot = v,
            (ParamValue::Gradient(slot), ParamValue::Gradient(v)) => *slot = v,
            (ParamValue::Matrix(slot), ParamValue::Matrix(v)) => *slot = v,
            (ParamValue::Text(slot), ParamValue::Text(v)) => *slot = v,
            (ParamValue::Image(slot), ParamValue::Image(v)) => *slot = v,
            (declared, got) => {
                return Err(TesseraError::validation(format!(
                    "parameter '{name}' is {}, got {}",
                    declared.type_tag(),
                    got.type_tag()
                )));
            }
        }
        Ok(())
    }

    /// Set a float parameter.
    pub fn set_float(&mut self, name: &str, value: f32) -> TesseraResult<()> {
        self.set(name, ParamValue::Float(value))
    }

    /// Set an int parameter.
    pub fn set_int(&mut self, name: &str, value: i64) -> TesseraResult<()> {
        self.set(name, ParamValue::Int(value))
    }

    /// Set an enum parameter by index.
    pub fn set_enum(&mut self, name: &str, index: usize) -> TesseraResult<()> {
        self.set(
            name,
            ParamValue::Enum {
                index,
                options: Vec::new(),
            },
        )
    }

    /// Float getter used on evaluation paths: a missing or mistyped name is
    /// logged loudly and falls back to `fallback` (degenerate, detectable).
    pub fn float_or(&self, name: &str, fallback: f32) -> f32 {
        match self.get(name) {
            Some(ParamValue::Float(v)) => *v,
            other => {
                tracing::error!(name, ?other, "float parameter lookup failed");
                fallback
            }
        }
    }

    /// Int getter with degenerate fallback; see [`ParamSet::float_or`].
    pub fn int_or(&self, name: &str, fallback: i64) -> i64 {
        match self.get(name) {
            Some(ParamValue::Int(v)) => *v,
            other => {
                tracing::error!(name, ?other, "int parameter lookup failed");
                fallback
            }
        }
    }

    /// Bool getter with degenerate fallback; see [`ParamSet::float_or`].
    pub fn bool_or(&self, name: &str, fallback: bool) -> bool {
        match self.get(name) {
            Some(ParamValue::Bool(v)) => *v,
            other => {
                tracing::error!(name, ?other, "bool parameter lookup failed");
                fallback
            }
        }
    }

    /// Enum index getter with degenerate fallback; see [`ParamSet::float_or`].
    pub fn enum_or(&self, name: &str, fallback: usize) -> usize {
        match self.get(name) {
            Some(ParamValue::Enum { index, .. }) => *index,
            other => {
                tracing::error!(name, ?other, "enum parameter lookup failed");
                fallback
            }
        }
    }

    /// Color getter with degenerate fallback; see [`ParamSet::float_or`].
    pub fn color_or(&self, name: &str, fallback: Rgba) -> Rgba {
        match self.get(name) {
            Some(ParamValue::Color(v)) => *v,
            other => {
                tracing::error!(name, ?other, "color parameter lookup failed");
                fallback
            }
        }
    }

    /// Gradient getter; falls back to black-to-white.
    pub fn gradient_or_default(&self, name: &str) -> Gradient {
        match self.get(name) {
            Some(ParamValue::Gradient(v)) => v.clone(),
            other => {
                tracing::error!(name, ?other, "gradient parameter lookup failed");
                Gradient::black_to_white()
            }
        }
    }

    /// Text getter with empty fallback; also serves image-reference reads.
    pub fn text_or_empty(&self, name: &str) -> String {
        match self.get(name) {
            Some(ParamValue::Text(v)) => v.clone(),
            Some(ParamValue::Image(v)) => v.clone(),
            other => {
                tracing::error!(name, ?other, "text parameter lookup failed");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> ParamSet {
        ParamSet::new()
            .with_float("width", 0.5)
            .with_int("count", 4)
            .with_enum("mode", 1, &["mix", "add", "multiply"])
            .with_color("tint", Rgba::WHITE)
    }

    #[test]
    fn set_rejects_type_mismatch() {
        let mut p = sample_set();
        assert!(p.set("width", ParamValue::Int(3)).is_err());
        assert!(p.set_float("width", 0.75).is_ok());
        assert_eq!(p.float_or("width", 0.0), 0.75);
    }

    #[test]
    fn set_rejects_unknown_name() {
        let mut p = sample_set();
        assert!(p.set_float("no_such", 1.0).is_err());
    }

    #[test]
    fn enum_index_bounds_are_enforced() {
        let mut p = sample_set();
        assert!(p.set_enum("mode", 3).is_err());
        assert!(p.set_enum("mode", 2).is_ok());
        assert_eq!(p.enum_or("mode", 0), 2);
    }

    #[test]
    fn getters_fall_back_on_mismatch() {
        let p = sample_set();
        assert_eq!(p.int_or("width", -1), -1);
        assert_eq!(p.float_or("missing", 9.0), 9.0);
    }

    #[test]
    fn gradient_sampling_interpolates_and_clamps() {
        let g = Gradient::new(vec![
            (0.25, Rgba::BLACK),
            (0.75, Rgba::WHITE),
        ])
        .unwrap();
        assert_eq!(g.sample(0.0), Rgba::BLACK);
        assert_eq!(g.sample(1.0), Rgba::WHITE);
        let mid = g.sample(0.5);
        assert!((mid.r - 0.5).abs() < 1e-6);
    }

    #[test]
    fn gradient_stops_are_sorted_on_construction() {
        let g = Gradient::new(vec![
            (1.0, Rgba::WHITE),
            (0.0, Rgba::BLACK),
        ])
        .unwrap();
        assert_eq!(g.stops()[0].0, 0.0);
    }
}
