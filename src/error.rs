//! Error types.

use thiserror::Error;

/// Problems with the arguments of an integration, detected before any
/// stepping takes place.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInputError {
    #[error("t_span must contain at least two times, got {len}")]
    TooFewTimes { len: usize },
    #[error("t_span[{index}] is not finite")]
    TimeNotFinite { index: usize },
    /// `t_span[index]` is not strictly greater than `t_span[index - 1]`.
    #[error("t_span is not in ascending order at index {index}")]
    NonAscendingTimeSpan { index: usize },
    #[error("step size {0} is zero or negative")]
    StepSizeZeroOrNeg(f64),
    /// Steps of this size would not move the time past `time` in floating
    /// point.
    #[error("step size {step} is too small to advance from t = {time}")]
    StepSizeTooSmall { step: f64, time: f64 },
    #[error("time bound is not finite")]
    TimeBoundNotFinite,
    #[error("time bound {bound} is not after the current time {time}")]
    TimeBoundNotAfterTime { bound: f64, time: f64 },
}

/// Errors returned by [`integrate`](crate::integrate).
///
/// `E` is the error type of the derivative function.
#[derive(Debug, Error)]
pub enum IntegrateError<E> {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),
    /// The derivative function failed during the sub-step starting at `t`.
    ///
    /// `source` is the derivative's own error, untouched.
    #[error("derivative evaluation failed in the step starting at t = {t}")]
    DerivativeEvaluation {
        t: f64,
        #[source]
        source: E,
    },
    /// Only returned when
    /// [`IntegrateOptions::check_finite`](crate::IntegrateOptions::check_finite)
    /// is enabled.
    #[error("state is not finite at t = {t}")]
    NonFiniteState { t: f64 },
}

impl<E> IntegrateError<E> {
    /// Returns the derivative's error, if that is what stopped the
    /// integration.
    pub fn into_derivative_error(self) -> Option<E> {
        match self {
            IntegrateError::DerivativeEvaluation { source, .. } => Some(source),
            _ => None,
        }
    }
}
