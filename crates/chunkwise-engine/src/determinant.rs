//! Determinants by Gaussian elimination with partial pivoting.
//!
//! Three forms share [`select_pivot`] and [`eliminate_row`] so they perform
//! the same floating point operations in the same order per row:
//!
//! - [`determinant_sequential`]: one thread, row-major buffer.
//! - [`determinant_row_parallel`]: one lane per row, two barrier waits per
//!   pivot iteration. Lane `t` only ever writes row slot `t`, except the pivot
//!   lane which may swap two slots while every other lane is parked.
//! - [`determinant_parallel_for`]: rayon parallel-for over the rows below the
//!   pivot; the end of each parallel-for is the barrier.

use std::sync::Barrier;

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use tracing::trace;

use chunkwise_core::{Error, KernelMode, MatrixTask, Result, RunParams};

/// Offset and magnitude of the largest absolute value in a pivot column.
///
/// Ties keep the first candidate, so no swap happens when the current row
/// is already maximal.
#[inline]
pub fn select_pivot(column: impl Iterator<Item = f64>) -> (usize, f64) {
    let mut best = (0, 0.0_f64);
    for (offset, value) in column.enumerate() {
        let magnitude = value.abs();
        if offset == 0 || magnitude > best.1 {
            best = (offset, magnitude);
        }
    }
    best
}

/// Subtract the multiple of `pivot` that zeroes `row[col]`.
#[inline]
pub fn eliminate_row(row: &mut [f64], pivot: &[f64], col: usize) {
    let factor = row[col] / pivot[col];
    row[col] = 0.0;
    for (value, &p) in row[col + 1..].iter_mut().zip(&pivot[col + 1..]) {
        *value -= factor * p;
    }
}

/// Sign times the diagonal product, with a zero result reported as `+0.0`.
fn finish(sign: f64, diagonal: impl Iterator<Item = f64>) -> f64 {
    let det = sign * diagonal.product::<f64>();
    if det == 0.0 {
        0.0
    } else {
        det
    }
}

fn swap_rows(values: &mut [f64], order: usize, a: usize, b: usize) {
    let (low, high) = (a.min(b), a.max(b));
    let (head, tail) = values.split_at_mut(high * order);
    head[low * order..(low + 1) * order].swap_with_slice(&mut tail[..order]);
}

/// Run elimination over a row-major buffer, handing the rows below each pivot
/// to `eliminate_below`.
fn eliminate_flat<F>(values: &mut [f64], order: usize, mut eliminate_below: F) -> f64
where
    F: FnMut(&mut [f64], &[f64], usize),
{
    debug_assert_eq!(values.len(), order * order);
    let mut sign = 1.0;

    for i in 0..order.saturating_sub(1) {
        let (offset, magnitude) = select_pivot((i..order).map(|r| values[r * order + i]));
        if magnitude == 0.0 {
            return 0.0;
        }
        if offset != 0 {
            swap_rows(values, order, i, i + offset);
            sign = -sign;
        }

        let (head, tail) = values.split_at_mut((i + 1) * order);
        let pivot = &head[i * order..];
        eliminate_below(tail, pivot, i);
    }

    finish(sign, (0..order).map(|i| values[i * order + i]))
}

/// Sequential elimination over a row-major `order * order` buffer, in place.
pub fn determinant_sequential(values: &mut [f64], order: usize) -> f64 {
    eliminate_flat(values, order, |rows, pivot, col| {
        for row in rows.chunks_exact_mut(order) {
            eliminate_row(row, pivot, col);
        }
    })
}

/// Elimination with a rayon parallel-for over the rows below each pivot.
pub fn determinant_parallel_for(values: &mut [f64], order: usize) -> f64 {
    eliminate_flat(values, order, |rows, pivot, col| {
        rows.par_chunks_mut(order)
            .for_each(|row| eliminate_row(row, pivot, col));
    })
}

/// State written by the pivot lane and read by every lane after the barrier.
#[derive(Debug)]
struct PivotState {
    sign: f64,
    singular: bool,
}

/// Elimination with one lane per row.
///
/// Every lane runs the same iteration sequence. In iteration `i` lane `i`
/// selects the pivot and swaps it into slot `i`; after the first barrier the
/// lanes below eliminate their own row against it; the second barrier keeps
/// iteration `i + 1` from reading a row that is still being updated.
pub fn determinant_row_parallel(values: &[f64], order: usize) -> f64 {
    debug_assert_eq!(values.len(), order * order);
    if order <= 1 {
        return finish(1.0, values.iter().copied());
    }

    let rows: Vec<RwLock<Vec<f64>>> = values
        .chunks_exact(order)
        .map(|row| RwLock::new(row.to_vec()))
        .collect();
    let barrier = Barrier::new(order);
    let state = Mutex::new(PivotState {
        sign: 1.0,
        singular: false,
    });

    std::thread::scope(|scope| {
        for lane in 0..order {
            let rows = &rows;
            let barrier = &barrier;
            let state = &state;
            scope.spawn(move || run_lane(lane, order, rows, barrier, state));
        }
    });

    let state = state.into_inner();
    if state.singular {
        return 0.0;
    }
    finish(state.sign, rows.iter().enumerate().map(|(i, row)| row.read()[i]))
}

fn run_lane(
    lane: usize,
    order: usize,
    rows: &[RwLock<Vec<f64>>],
    barrier: &Barrier,
    state: &Mutex<PivotState>,
) {
    for i in 0..order - 1 {
        if lane == i {
            let (offset, magnitude) = select_pivot(rows[i..].iter().map(|row| row.read()[i]));
            if magnitude == 0.0 {
                state.lock().singular = true;
            } else if offset != 0 {
                let mut own = rows[i].write();
                let mut other = rows[i + offset].write();
                std::mem::swap(&mut *own, &mut *other);
                state.lock().sign *= -1.0;
            }
        }

        barrier.wait();
        if state.lock().singular {
            trace!(lane, column = i, "singular pivot column");
            return;
        }

        if lane > i {
            let pivot = rows[i].read();
            let mut row = rows[lane].write();
            eliminate_row(&mut row, &pivot, i);
        }

        barrier.wait();
    }
}

/// Determinant kernel selected from the broadcast run parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericKernel {
    mode: KernelMode,
    max_lanes: usize,
}

impl NumericKernel {
    /// Create a kernel.
    pub const fn new(mode: KernelMode, max_lanes: usize) -> Self {
        Self { mode, max_lanes }
    }

    /// Kernel described by the run parameters.
    pub const fn from_params(params: &RunParams) -> Self {
        Self::new(params.kernel, params.max_lanes)
    }

    /// Concrete form used for a matrix of the given order.
    ///
    /// `Auto` uses one lane per row up to `max_lanes` rows. An explicit
    /// row-parallel request above that ceiling runs as a parallel-for instead
    /// of spawning more lanes.
    pub fn resolve(&self, order: usize) -> KernelMode {
        match self.mode {
            KernelMode::Auto if order > 1 && order <= self.max_lanes => KernelMode::RowParallel,
            KernelMode::Auto => KernelMode::Sequential,
            KernelMode::RowParallel if order > self.max_lanes => KernelMode::ParallelFor,
            mode => mode,
        }
    }

    /// Determinant of one task.
    ///
    /// `scratch` is overwritten with the task values and eliminated in place;
    /// its allocation is reused across calls.
    pub fn determinant(&self, task: &MatrixTask, scratch: &mut Vec<f64>) -> Result<f64> {
        if !task.is_well_formed() {
            return Err(Error::invalid_input(
                format!("matrix {}", task.index),
                format!(
                    "order {} does not match {} values",
                    task.order,
                    task.values.len()
                ),
            ));
        }

        let order = task.order;
        let value = match self.resolve(order) {
            KernelMode::RowParallel => determinant_row_parallel(&task.values, order),
            mode => {
                scratch.clear();
                scratch.extend_from_slice(&task.values);
                if mode == KernelMode::ParallelFor {
                    determinant_parallel_for(scratch, order)
                } else {
                    determinant_sequential(scratch, order)
                }
            }
        };
        Ok(value)
    }
}

impl Default for NumericKernel {
    fn default() -> Self {
        Self::from_params(&RunParams::default())
    }
}
