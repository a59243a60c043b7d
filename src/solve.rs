use ndarray::prelude::*;
use tracing::debug;

use crate::error::IntegrateError;
use crate::progress::{NoProgress, Progress, ProgressReporter};
use crate::rk::{RungeKutta, RK4};
use crate::span::checkpoints;
use crate::trajectory::Trajectory;
use crate::OdeIntegrate;

/// Options for [`integrate_with`].
#[derive(Clone, Debug)]
pub struct IntegrateOptions {
    /// Report progress every this many sub-steps. Zero disables reporting.
    pub progress_interval: usize,
    /// Fail with [`IntegrateError::NonFiniteState`] as soon as a sub-step
    /// produces a NaN or infinite state. Off by default, in which case
    /// non-finite values propagate into the trajectory.
    pub check_finite: bool,
}

impl Default for IntegrateOptions {
    fn default() -> Self {
        Self {
            progress_interval: 10_000,
            check_finite: false,
        }
    }
}

/// Integrates a system of ODEs `dy/dt = fun(t, y, params)` with the classical
/// 4th-order Runge–Kutta method.
///
/// # Parameters
///
/// * `fun`: Right-hand side of the system, where calling `fun(t, y, params,
///   deriv_y)` should fill in `deriv_y` with the derivative of `y` at time
///   `t`. An error returned by `fun` stops the integration and is passed on
///   to the caller.
///
/// * `t_span`: Either `[t0, tf]`, in which case the solution is recorded
///   every `h` starting at `t0` plus once more at `tf`, or a list of
///   strictly increasing times at which the solution is recorded.
///
/// * `y0`: Initial state at `t_span[0]`.
///
/// * `h`: Step size. Between two checkpoints the solver takes steps of
///   `min(h, interval)`, shortening the last one to land on the checkpoint.
///
/// * `params`: Extra parameters, passed unchanged to every call of `fun`.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use std::convert::Infallible;
///
/// let sol = ndarray_rk4::integrate(
///     |_t, y, k: &f64, mut dy| {
///         dy[0] = -k * y[0];
///         Ok::<(), Infallible>(())
///     },
///     &[0., 1.],
///     array![1.].view(),
///     0.01,
///     &1.,
/// )
/// .unwrap();
/// assert_eq!(sol.final_time(), 1.);
/// assert!((sol.final_state()[0] - (-1f64).exp()).abs() < 1e-6);
/// ```
pub fn integrate<F, P, E>(
    fun: F,
    t_span: &[f64],
    y0: ArrayView1<f64>,
    h: f64,
    params: &P,
) -> Result<Trajectory, IntegrateError<E>>
where
    F: FnMut(f64, ArrayView1<f64>, &P, ArrayViewMut1<f64>) -> Result<(), E>,
    P: ?Sized,
{
    integrate_with(
        fun,
        t_span,
        y0,
        h,
        params,
        &IntegrateOptions::default(),
        &mut NoProgress,
    )
}

/// Like [`integrate`], with explicit options and a progress reporter.
///
/// `progress` is called every `options.progress_interval` sub-steps.
pub fn integrate_with<F, P, E, R>(
    fun: F,
    t_span: &[f64],
    y0: ArrayView1<f64>,
    h: f64,
    params: &P,
    options: &IntegrateOptions,
    progress: &mut R,
) -> Result<Trajectory, IntegrateError<E>>
where
    F: FnMut(f64, ArrayView1<f64>, &P, ArrayViewMut1<f64>) -> Result<(), E>,
    P: ?Sized,
    R: ProgressReporter + ?Sized,
{
    let t = checkpoints(t_span, h)?;
    let (t0, tf) = (t[0], t[t.len() - 1]);

    let mut y = Array2::zeros((t.len(), y0.len()));
    y.row_mut(0).assign(&y0);

    debug!(
        checkpoints = t.len(),
        step_size = h,
        dim = y0.len(),
        "starting RK4 integration"
    );

    let mut solver = RungeKutta::<_, _, RK4>::new(fun, params, t0, y0.to_owned(), h)?;
    for (i, &t_next) in t.iter().enumerate().skip(1) {
        solver.set_time_bound(t_next)?;
        while !solver.finished() {
            let t_start = solver.time();
            solver
                .step()
                .map_err(|source| IntegrateError::DerivativeEvaluation { t: t_start, source })?;

            if options.check_finite && !solver.state().iter().all(|x| x.is_finite()) {
                return Err(IntegrateError::NonFiniteState { t: solver.time() });
            }
            let steps = solver.num_steps();
            if options.progress_interval > 0 && steps % options.progress_interval == 0 {
                progress.report(&Progress {
                    steps,
                    time: solver.time(),
                    percent: solver.time() / tf * 100.,
                });
            }
        }
        y.row_mut(i).assign(&solver.state());
    }

    debug!(steps = solver.num_steps(), "finished RK4 integration");
    Ok(Trajectory::new(t, y))
}
