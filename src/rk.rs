//! Fixed-step Runge–Kutta solvers.

use lazy_static::lazy_static;
use ndarray::prelude::*;
use ndarray::s;
use std::marker::PhantomData;

use crate::error::InvalidInputError;
use crate::OdeIntegrate;

/// Steps shorter than this many ulps of the time are not taken: a remainder
/// that short is absorbed into the current step, and a step size that short
/// is rejected.
const MIN_STEP_ULPS: f64 = 10.;

/// Computes the next representable floating-point value following `x` in the
/// direction of `y`.
///
/// Special cases:
///
/// * If `x` equals `y`, then `y` is returned.
/// * If `x` or `y` is NAN, a NAN is returned.
///
/// There is no special handling for overflow of finite values to ±∞ or
/// subnormals.
fn next_after(x: f64, y: f64) -> f64 {
    if x.is_nan() || y.is_nan() {
        f64::NAN
    } else if x == y {
        y
    } else if x == 0. {
        if y < 0. {
            -f64::from_bits(1)
        } else {
            f64::from_bits(1)
        }
    } else if (y > x) == (x > 0.) {
        f64::from_bits(x.to_bits().wrapping_add(1))
    } else {
        f64::from_bits(x.to_bits().wrapping_sub(1))
    }
}

/// Smallest step that reliably advances the time anywhere between `a` and
/// `b`.
pub(crate) fn min_step(a: f64, b: f64) -> f64 {
    let x = a.abs().max(b.abs());
    MIN_STEP_ULPS * (next_after(x, f64::INFINITY) - x)
}

/// Fixed-step Runge–Kutta ODE solver.
///
/// The solver advances toward a movable time bound (see
/// [`set_time_bound`](RungeKutta::set_time_bound)) using sub-steps no larger
/// than `max_step`. The last sub-step before the bound is shortened so that
/// the time lands exactly on the bound.
pub struct RungeKutta<'p, F, P: ?Sized, O>
where
    O: FixedStepMethod,
{
    fun: F,
    /// Extra parameters passed to `fun` on every evaluation.
    params: &'p P,
    method: PhantomData<O>,
    /// Current time.
    t: f64,
    /// Current state.
    y: Array1<f64>,
    /// Previous time, or `None` if there haven't been any steps.
    t_old: Option<f64>,
    /// Boundary time of the current interval.
    t_bound: f64,
    /// Maximum step size.
    max_step: f64,
    /// Sub-step used within the current interval.
    h: f64,
    /// Storage array for Runge Kutta stages, shape `O::NUM_STAGES, self.len()`.
    k: Array2<f64>,
    num_steps: usize,
}

impl<'p, F, P, O, E> RungeKutta<'p, F, P, O>
where
    F: FnMut(f64, ArrayView1<f64>, &P, ArrayViewMut1<f64>) -> Result<(), E>,
    P: ?Sized,
    O: FixedStepMethod,
{
    /// Creates a new `RungeKutta` solver.
    ///
    /// # Parameters
    ///
    /// * `fun`: Right-hand side of the system, where calling `fun(t, y,
    ///   params, deriv_y)` should fill in `deriv_y` with the derivative of `y`
    ///   at time `t`.
    ///
    /// * `params`: Extra parameters, passed unchanged to every call of `fun`.
    ///
    /// * `t0`: Initial value of the independent variable.
    ///
    /// * `y0`: Initial values of the dependent variable.
    ///
    /// * `max_step`: Maximum allowed step size. May be `INFINITY`, in which
    ///   case each interval is crossed in a single step.
    ///
    /// The time bound starts out equal to `t0`, so the solver is
    /// [`finished`](OdeIntegrate::finished) until a later bound is set.
    pub fn new(
        fun: F,
        params: &'p P,
        t0: f64,
        y0: Array1<f64>,
        max_step: f64,
    ) -> Result<RungeKutta<'p, F, P, O>, InvalidInputError> {
        if !(max_step > 0.) {
            return Err(InvalidInputError::StepSizeZeroOrNeg(max_step));
        }
        let k = Array2::zeros((O::NUM_STAGES, y0.len()));
        Ok(RungeKutta {
            fun,
            params,
            method: PhantomData,
            t: t0,
            y: y0,
            t_old: None,
            t_bound: t0,
            max_step,
            h: 0.,
            k,
            num_steps: 0,
        })
    }

    /// Starts a new interval ending at `t_bound`.
    ///
    /// Steps within the interval are `min(max_step, t_bound - t)` long, where
    /// `t` is the current time.
    ///
    /// Fails if those steps are too small to advance the time, unless a
    /// single step crosses the whole interval.
    pub fn set_time_bound(&mut self, t_bound: f64) -> Result<(), InvalidInputError> {
        if !t_bound.is_finite() {
            return Err(InvalidInputError::TimeBoundNotFinite);
        }
        if !(t_bound > self.t) {
            return Err(InvalidInputError::TimeBoundNotAfterTime {
                bound: t_bound,
                time: self.t,
            });
        }
        let h = self.max_step.min(t_bound - self.t);
        if h < t_bound - self.t && h < min_step(self.t, t_bound) {
            return Err(InvalidInputError::StepSizeTooSmall {
                step: h,
                time: self.t,
            });
        }
        self.t_bound = t_bound;
        self.h = h;
        Ok(())
    }

    /// Size of last step or `None` if no steps were made yet.
    pub fn step_size(&self) -> Option<f64> {
        self.t_old.map(|t_old| self.t - t_old)
    }

    /// Number of steps taken since the solver was created.
    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    /// Consumes the solver, returning the current state.
    pub fn into_state(self) -> Array1<f64> {
        self.y
    }

    /// Computes the solution at `t + h` from the current time and state.
    ///
    /// Notation for Butcher tableau is as in (ref 1).
    ///
    /// # References
    ///
    /// 1. E. Hairer, S. P. Norsett G. Wanner, "Solving Ordinary Differential
    ///    Equations I: Nonstiff Problems", Sec. II.1.
    fn step_by(&mut self, h: f64) -> Result<Array1<f64>, E> {
        (self.fun)(
            self.t,
            self.y.view(),
            self.params,
            self.k.slice_mut(s![0, ..]),
        )?;
        for (s, (a, c)) in O::a().iter().zip(O::c()).enumerate() {
            let dy = self.k.slice(s![..s + 1, ..]).t().dot(a) * h;
            (self.fun)(
                self.t + c * h,
                (dy + &self.y).view(),
                self.params,
                self.k.slice_mut(s![s + 1, ..]),
            )?;
        }
        Ok(h * self.k.t().dot(&O::b()) + &self.y)
    }
}

impl<'p, F, P, O, E> OdeIntegrate for RungeKutta<'p, F, P, O>
where
    F: FnMut(f64, ArrayView1<f64>, &P, ArrayViewMut1<f64>) -> Result<(), E>,
    P: ?Sized,
    O: FixedStepMethod,
{
    type Error = E;

    fn len(&self) -> usize {
        self.y.len()
    }

    /// Does nothing if the solver is already at its time bound.
    fn step(&mut self) -> Result<(), E> {
        if self.finished() {
            return Ok(());
        }
        let t_new = if self.h >= self.t_bound - self.t - min_step(self.t, self.t_bound) {
            self.t_bound
        } else {
            self.t + self.h
        };
        let y_new = self.step_by(t_new - self.t)?;
        self.t_old = Some(self.t);
        self.t = t_new;
        self.y = y_new;
        self.num_steps += 1;
        Ok(())
    }

    fn time(&self) -> f64 {
        self.t
    }

    fn time_bound(&self) -> f64 {
        self.t_bound
    }

    fn state(&self) -> ArrayView1<'_, f64> {
        self.y.view()
    }
}

/// Butcher tableau of an explicit fixed-step Runge–Kutta method.
pub trait FixedStepMethod {
    /// Order of the method.
    const ORDER: usize;

    /// Number of stages in the method.
    const NUM_STAGES: usize;

    /// Coefficients for incrementing time for consecutive RK stages, length
    /// `NUM_STAGES - 1`.
    ///
    /// The value for the first stage is always zero, so it is not included.
    fn c() -> ArrayView1<'static, f64>;

    /// Coefficients for combining previous RK stages to compute the next
    /// stage, length `NUM_STAGES - 1`.
    ///
    /// For explicit methods the coefficients above the main diagonal are
    /// zeros, so `a` is stored as a list of arrays of increasing lengths. The
    /// first stage is always just `f`, thus no coefficients for it are
    /// required.
    fn a() -> &'static [ArrayView1<'static, f64>];

    /// Coefficients for combining RK stages for computing the final
    /// prediction, length `NUM_STAGES`.
    fn b() -> ArrayView1<'static, f64>;
}

/// The classical Runge–Kutta method of order 4.
///
/// ```text
/// k1 = f(t,        y)
/// k2 = f(t + h/2,  y + h/2 k1)
/// k3 = f(t + h/2,  y + h/2 k2)
/// k4 = f(t + h,    y + h k3)
/// y_next = y + h/6 (k1 + 2 k2 + 2 k3 + k4)
/// ```
pub struct RK4;

impl FixedStepMethod for RK4 {
    const ORDER: usize = 4;

    const NUM_STAGES: usize = 4;

    fn c() -> ArrayView1<'static, f64> {
        aview1(&[1./2., 1./2., 1.])
    }

    fn a() -> &'static [ArrayView1<'static, f64>] {
        lazy_static! {
            static ref A: [ArrayView1<'static, f64>; 4 - 1] = [
                aview1(&[1./2.]),
                aview1(&[0., 1./2.]),
                aview1(&[0., 0., 1.]),
            ];
        }
        &*A
    }

    fn b() -> ArrayView1<'static, f64> {
        aview1(&[1./6., 1./3., 1./3., 1./6.])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::cell::Cell;
    use std::convert::Infallible;

    fn decay(
        _t: f64,
        y: ArrayView1<f64>,
        _: &(),
        mut dy: ArrayViewMut1<f64>,
    ) -> Result<(), Infallible> {
        dy.assign(&-&y);
        Ok(())
    }

    #[test]
    fn tableau_is_consistent() {
        assert_eq!(RK4::c().len(), RK4::NUM_STAGES - 1);
        assert_eq!(RK4::a().len(), RK4::NUM_STAGES - 1);
        assert_eq!(RK4::b().len(), RK4::NUM_STAGES);
        assert!((RK4::b().sum() - 1.).abs() < 1e-15);
        for (a, &c) in RK4::a().iter().zip(RK4::c()) {
            assert!((a.sum() - c).abs() < 1e-15);
        }
    }

    #[test]
    fn single_step_matches_taylor_polynomial() {
        let h = 0.1;
        let mut solver = RungeKutta::<_, _, RK4>::new(decay, &(), 0., array![1.], h).unwrap();
        solver.set_time_bound(1.).unwrap();
        solver.step().unwrap();
        let expected = 1. - h + h.powi(2) / 2. - h.powi(3) / 6. + h.powi(4) / 24.;
        assert!((solver.state()[0] - expected).abs() < 1e-15);
        assert_eq!(solver.time(), h);
        assert_eq!(solver.step_size(), Some(h));
    }

    #[test]
    fn last_step_lands_on_bound() {
        let mut solver = RungeKutta::<_, _, RK4>::new(decay, &(), 0., array![1.], 0.3).unwrap();
        solver.set_time_bound(1.).unwrap();
        solver.run_to_bound().unwrap();
        assert_eq!(solver.time(), 1.);
        assert_eq!(solver.num_steps(), 4);
        assert!((solver.step_size().unwrap() - 0.1).abs() < 1e-12);
        assert!(solver.finished());

        // Stepping past the bound is a no-op.
        solver.step().unwrap();
        assert_eq!(solver.num_steps(), 4);
    }

    #[test]
    fn sub_step_is_limited_by_interval() {
        let mut solver = RungeKutta::<_, _, RK4>::new(decay, &(), 0., array![1.], 10.).unwrap();
        solver.set_time_bound(0.25).unwrap();
        solver.run_to_bound().unwrap();
        assert_eq!(solver.num_steps(), 1);
        assert_eq!(solver.time(), 0.25);
        solver.set_time_bound(0.5).unwrap();
        solver.run_to_bound().unwrap();
        assert_eq!(solver.num_steps(), 2);
        assert_eq!(solver.time(), 0.5);
    }

    #[test]
    fn four_evaluations_per_step() {
        let calls = Cell::new(0);
        let mut solver = RungeKutta::<_, _, RK4>::new(
            |_t, y, _: &(), mut dy| {
                calls.set(calls.get() + 1);
                dy.assign(&y);
                Ok::<(), Infallible>(())
            },
            &(),
            0.,
            array![1., 2.],
            0.1,
        )
        .unwrap();
        solver.set_time_bound(0.5).unwrap();
        solver.run_to_bound().unwrap();
        assert_eq!(calls.get(), 4 * solver.num_steps());
    }

    #[test]
    fn invalid_arguments() {
        assert!(RungeKutta::<_, _, RK4>::new(decay, &(), 0., array![1.], 0.).is_err());
        assert!(RungeKutta::<_, _, RK4>::new(decay, &(), 0., array![1.], f64::NAN).is_err());
        let mut solver = RungeKutta::<_, _, RK4>::new(decay, &(), 1., array![1.], 0.1).unwrap();
        assert_eq!(
            solver.set_time_bound(1.),
            Err(InvalidInputError::TimeBoundNotAfterTime { bound: 1., time: 1. })
        );
        assert_eq!(
            solver.set_time_bound(f64::INFINITY),
            Err(InvalidInputError::TimeBoundNotFinite)
        );
    }

    #[test]
    fn step_below_time_resolution_is_rejected() {
        // Spacing between floats near 1e16 is 2.
        let mut solver =
            RungeKutta::<_, _, RK4>::new(decay, &(), 1e16, array![1.], 0.5).unwrap();
        assert_eq!(
            solver.set_time_bound(1e16 + 100.),
            Err(InvalidInputError::StepSizeTooSmall { step: 0.5, time: 1e16 })
        );
        assert!(solver.finished());

        // Fine when a single step covers the interval.
        let mut solver =
            RungeKutta::<_, _, RK4>::new(decay, &(), 1e16, array![1.], 100.).unwrap();
        solver.set_time_bound(1e16 + 2.).unwrap();
        solver.run_to_bound().unwrap();
        assert_eq!(solver.num_steps(), 1);
        assert_eq!(solver.time(), 1e16 + 2.);
    }

    #[test]
    fn next_after_moves_one_ulp() {
        assert_eq!(next_after(1., f64::INFINITY), 1. + f64::EPSILON);
        assert_eq!(next_after(1., 1.), 1.);
        assert_eq!(next_after(0., 1.), f64::from_bits(1));
        assert!(next_after(f64::NAN, 1.).is_nan());
    }
}
