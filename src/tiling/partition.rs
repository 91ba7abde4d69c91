//! Row partitioning across workers.
//!
//! Rows are split into contiguous ranges of `span = ceil(rows / requested)`.
//! Only ranges that start inside the grid get a worker, so a small grid
//! runs with fewer workers than requested.

use std::ops::Range;

use crate::error::TilingError;

/// A contiguous half-open row range handled by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkAssignment {
    pub worker: usize,
    pub start: u64,
    pub end: u64,
}

impl WorkAssignment {
    pub fn rows(&self) -> Range<u64> {
        self.start..self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// All assignments of one slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPlan {
    pub requested: usize,
    pub span: u64,
    pub assignments: Vec<WorkAssignment>,
}

impl WorkPlan {
    pub fn effective_workers(&self) -> usize {
        self.assignments.len()
    }

    /// Whether fewer workers run than were requested.
    pub fn is_adapted(&self) -> bool {
        self.effective_workers() < self.requested
    }
}

pub fn partition(total_rows: u64, requested_workers: usize) -> Result<WorkPlan, TilingError> {
    if requested_workers == 0 {
        return Err(TilingError::InvalidConfig(
            "at least one worker is required".to_string(),
        ));
    }

    let span = total_rows.div_ceil(requested_workers as u64);
    let assignments = if span == 0 {
        Vec::new()
    } else {
        (0..total_rows)
            .step_by(span as usize)
            .enumerate()
            .map(|(worker, start)| WorkAssignment {
                worker,
                start,
                end: (start + span).min(total_rows),
            })
            .collect()
    };

    Ok(WorkPlan {
        requested: requested_workers,
        span,
        assignments,
    })
}
