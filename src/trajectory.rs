use ndarray::prelude::*;

/// Solution sampled at the checkpoint times.
///
/// Row `i` of [`states`](Trajectory::states) is the state at
/// `times()[i]`. The first row is the initial state.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    t: Array1<f64>,
    y: Array2<f64>,
}

impl Trajectory {
    pub(crate) fn new(t: Array1<f64>, y: Array2<f64>) -> Trajectory {
        debug_assert_eq!(t.len(), y.nrows());
        debug_assert!(!t.is_empty());
        Trajectory { t, y }
    }

    /// Checkpoint times, strictly increasing.
    pub fn times(&self) -> ArrayView1<'_, f64> {
        self.t.view()
    }

    /// State matrix, shape `(self.len(), self.dim())`.
    pub fn states(&self) -> ArrayView2<'_, f64> {
        self.y.view()
    }

    /// Number of checkpoints, including the initial time.
    pub fn len(&self) -> usize {
        self.t.len()
    }

    /// Number of elements in each state.
    pub fn dim(&self) -> usize {
        self.y.ncols()
    }

    /// State at checkpoint `i`.
    ///
    /// **Panics** if `i` is out of bounds.
    pub fn state(&self, i: usize) -> ArrayView1<'_, f64> {
        self.y.row(i)
    }

    pub fn final_time(&self) -> f64 {
        self.t[self.t.len() - 1]
    }

    pub fn final_state(&self) -> ArrayView1<'_, f64> {
        self.y.row(self.y.nrows() - 1)
    }

    /// Iterates over `(time, state)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, ArrayView1<'_, f64>)> + '_ {
        self.t.iter().cloned().zip(self.y.outer_iter())
    }

    /// Returns the checkpoint times and the state matrix.
    pub fn into_parts(self) -> (Array1<f64>, Array2<f64>) {
        (self.t, self.y)
    }
}
