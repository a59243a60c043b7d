//! Derivation of output checkpoints from a time span.

use ndarray::prelude::*;

use crate::error::InvalidInputError;
use crate::rk::min_step;

/// Synthesized times closer to the final time than this many ulps are
/// replaced by the final time.
const LANDING_ULPS: f64 = 4.;

/// Returns the checkpoint times at which the solution is recorded.
///
/// * If `t_span` is `[t0, tf]`, the checkpoints are `t0, t0 + h, t0 + 2h,
///   ...` up to (but not exceeding) `tf`, followed by `tf` itself if the
///   last synthesized time falls short of it.
///
/// * If `t_span` has more than two elements, it is used verbatim.
///
/// # Errors
///
/// Fails if `t_span` has fewer than two elements, contains non-finite
/// values or is not strictly increasing, if `h` is not positive, or if `h`
/// is too small to advance the time within some interval.
pub fn checkpoints(t_span: &[f64], h: f64) -> Result<Array1<f64>, InvalidInputError> {
    if t_span.len() < 2 {
        return Err(InvalidInputError::TooFewTimes { len: t_span.len() });
    }
    if let Some(index) = t_span.iter().position(|t| !t.is_finite()) {
        return Err(InvalidInputError::TimeNotFinite { index });
    }
    if let Some(index) = t_span.windows(2).position(|w| w[1] <= w[0]) {
        return Err(InvalidInputError::NonAscendingTimeSpan { index: index + 1 });
    }
    if !(h > 0.) {
        return Err(InvalidInputError::StepSizeZeroOrNeg(h));
    }

    for w in t_span.windows(2) {
        check_resolution(w[0], w[1], h)?;
    }

    if t_span.len() > 2 {
        return Ok(aview1(t_span).to_owned());
    }

    let (t0, tf) = (t_span[0], t_span[1]);
    let tol = LANDING_ULPS * f64::EPSILON * t0.abs().max(tf.abs());
    let mut t = vec![t0];
    // Multiply instead of accumulating so that the error in `t0 + k * h`
    // doesn't grow with `k`.
    for k in 1_u64.. {
        let t_k = t0 + k as f64 * h;
        if !(t_k < tf - tol) {
            break;
        }
        t.push(t_k);
    }
    t.push(tf);
    Ok(Array1::from(t))
}

/// Checks that steps of `min(h, b - a)` move the time forward everywhere in
/// `[a, b]`.
fn check_resolution(a: f64, b: f64, h: f64) -> Result<(), InvalidInputError> {
    if h < b - a && h < min_step(a, b) {
        Err(InvalidInputError::StepSizeTooSmall { step: h, time: a })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn explicit_span_is_verbatim() {
        let span = [0., 0.5, 1., 2.];
        assert_eq!(checkpoints(&span, 0.1).unwrap(), aview1(&span));
    }

    #[test]
    fn two_element_span_appends_remainder() {
        let t = checkpoints(&[0., 1.], 0.3).unwrap();
        assert_eq!(t.len(), 5);
        assert_eq!(t[0], 0.);
        assert_eq!(t[1], 0.3);
        assert_eq!(t[4], 1.);
        assert!((t[3] - 0.9).abs() < 1e-15);
    }

    #[test]
    fn two_element_span_exact_multiple() {
        let t = checkpoints(&[0., 1.], 0.25).unwrap();
        assert_eq!(t, array![0., 0.25, 0.5, 0.75, 1.]);
    }

    #[test]
    fn rounding_does_not_create_tiny_interval() {
        // 10 * 0.1 rounds to exactly 1, but 0.1 + ... would not.
        let t = checkpoints(&[0., 1.], 0.1).unwrap();
        assert_eq!(t.len(), 11);
        assert_eq!(t[10], 1.);
        assert!(t.windows(2).into_iter().all(|w| w[1] - w[0] > 0.09));
    }

    #[test]
    fn step_larger_than_span() {
        assert_eq!(checkpoints(&[2., 3.], 10.).unwrap(), array![2., 3.]);
        assert_eq!(checkpoints(&[2., 3.], f64::INFINITY).unwrap(), array![2., 3.]);
    }

    #[test]
    fn invalid_spans() {
        assert_eq!(
            checkpoints(&[1., 0.], 0.1),
            Err(InvalidInputError::NonAscendingTimeSpan { index: 1 })
        );
        assert_eq!(
            checkpoints(&[0., 1., 1., 2.], 0.1),
            Err(InvalidInputError::NonAscendingTimeSpan { index: 2 })
        );
        assert_eq!(
            checkpoints(&[0.], 0.1),
            Err(InvalidInputError::TooFewTimes { len: 1 })
        );
        assert_eq!(
            checkpoints(&[0., f64::NAN], 0.1),
            Err(InvalidInputError::TimeNotFinite { index: 1 })
        );
        assert_eq!(
            checkpoints(&[0., 1.], 0.),
            Err(InvalidInputError::StepSizeZeroOrNeg(0.))
        );
        assert_eq!(
            checkpoints(&[0., 1.], -0.5),
            Err(InvalidInputError::StepSizeZeroOrNeg(-0.5))
        );
        assert!(checkpoints(&[0., 1.], f64::NAN).is_err());
    }

    #[test]
    fn step_below_time_resolution() {
        // Spacing between floats near 1e16 is 2, so `1e16 + 0.5` rounds back
        // to `1e16`.
        assert_eq!(
            checkpoints(&[1e16, 1e16 + 100.], 0.5),
            Err(InvalidInputError::StepSizeTooSmall { step: 0.5, time: 1e16 })
        );
        assert_eq!(
            checkpoints(&[0., 1e16, 1e16 + 100.], 0.5),
            Err(InvalidInputError::StepSizeTooSmall { step: 0.5, time: 0. })
        );
        // A step that crosses the whole interval is fine.
        assert_eq!(
            checkpoints(&[1e16, 1e16 + 4.], 8.).unwrap(),
            array![1e16, 1e16 + 4.]
        );
        let t = checkpoints(&[1e16, 1e16 + 100.], 20.).unwrap();
        assert_eq!(t.len(), 6);
        assert!(t.windows(2).into_iter().all(|w| w[1] > w[0]));
    }
}
