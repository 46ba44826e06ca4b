// ============================================================
// Layer 5 — Model Errors
// ============================================================
// Typed configuration and shape errors raised before any
// tensor work starts. They convert into anyhow::Error at the
// application boundary.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// A dense projection was given a different number of widths and activations
    #[error("dense projection has {units} widths but {activations} activations")]
    StageMismatch { units: usize, activations: usize },

    #[error("dense projection needs at least one stage")]
    EmptyProjection,

    #[error("`{name}` must be greater than zero")]
    ZeroDimension { name: &'static str },

    #[error("{what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what:     &'static str,
        expected: usize,
        actual:   usize,
    },
}

impl ModelError {
    pub fn shape(what: &'static str, expected: usize, actual: usize) -> Self {
        ModelError::ShapeMismatch { what, expected, actual }
    }

    /// Fails when `actual` differs from `expected`.
    pub fn check(what: &'static str, expected: usize, actual: usize) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::shape(what, expected, actual))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_passes_on_equal() {
        assert!(ModelError::check("vertices", 207, 207).is_ok());
    }

    #[test]
    fn test_check_reports_both_sizes() {
        let err = ModelError::check("vertices", 207, 206).unwrap_err();
        assert_eq!(err.to_string(), "vertices: expected 207, got 206");
    }
}
