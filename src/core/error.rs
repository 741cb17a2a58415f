use thiserror::Error;

/// Rejection of a whole request before the numeric core runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("{field} must be {requirement}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
    },
}

impl InvalidInput {
    pub fn field(&self) -> &'static str {
        match self {
            InvalidInput::NotFinite { field } | InvalidInput::OutOfRange { field, .. } => field,
        }
    }
}

pub(crate) fn require_finite(field: &'static str, value: f64) -> Result<f64, InvalidInput> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InvalidInput::NotFinite { field })
    }
}

pub(crate) fn require(
    field: &'static str,
    ok: bool,
    requirement: &'static str,
) -> Result<(), InvalidInput> {
    if ok {
        Ok(())
    } else {
        Err(InvalidInput::OutOfRange { field, requirement })
    }
}
