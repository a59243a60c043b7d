//! Fixed-step 4th-order Runge–Kutta integration of ODE systems, built on
//! `ndarray`.
//!
//! The main entry point is [`integrate`], which advances `dy/dt = f(t, y,
//! params)` through a list of checkpoint times and returns the solution at
//! each of them as a [`Trajectory`]. For finer control, the underlying
//! [`rk::RungeKutta`] solver can be driven directly through the
//! [`OdeIntegrate`] trait.

pub mod error;
pub mod progress;
pub mod rk;
mod solve;
pub mod span;
mod trajectory;

pub use crate::error::{IntegrateError, InvalidInputError};
pub use crate::progress::{LogProgress, NoProgress, Progress, ProgressReporter};
pub use crate::solve::{integrate, integrate_with, IntegrateOptions};
pub use crate::trajectory::Trajectory;

use ndarray::prelude::*;

pub trait OdeIntegrate {
    /// Error produced by a failed step.
    type Error;
    /// Returns the number of elements in the state.
    fn len(&self) -> usize;
    /// Perform one fixed-size step.
    fn step(&mut self) -> Result<(), Self::Error>;
    /// Current time.
    fn time(&self) -> f64;
    /// The ending time.
    fn time_bound(&self) -> f64;
    /// Current state.
    fn state(&self) -> ArrayView1<'_, f64>;
    /// Returns `true` if the integration has reached `time_bound`.
    fn finished(&self) -> bool {
        self.time() >= self.time_bound()
    }
    /// Integrate until reaching `time_bound`.
    fn run_to_bound(&mut self) -> Result<(), Self::Error> {
        while !self.finished() {
            self.step()?;
        }
        Ok(())
    }
}
