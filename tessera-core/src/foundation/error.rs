/// Convenience result type used across Tessera.
pub type TesseraResult<T> = Result<T, TesseraError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum TesseraError {
    /// Invalid user-provided data (bad descriptor, bad parameter value).
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while evaluating or rasterizing a channel subgraph.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors while reading or writing the graph text format.
    #[error("parse error: {0}")]
    Parse(String),

    /// A node id that is not (or no longer) part of the graph.
    #[error("unknown node: {0}")]
    UnknownNode(u64),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TesseraError {
    /// Build a [`TesseraError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TesseraError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`TesseraError::Parse`] value.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_pick_the_right_variant() {
        assert!(matches!(
            TesseraError::validation("x"),
            TesseraError::Validation(_)
        ));
        assert!(matches!(
            TesseraError::evaluation("x"),
            TesseraError::Evaluation(_)
        ));
        assert!(matches!(TesseraError::parse("x"), TesseraError::Parse(_)));
    }

    #[test]
    fn display_includes_message() {
        let e = TesseraError::parse("bad token");
        assert_eq!(e.to_string(), "parse error: bad token");
    }
}
