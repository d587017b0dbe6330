// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

/// Part of the factorization in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Task {
    #[default]
    NoTask,
    PreProcessing,
    SparsePhase,
    DensePhase,
    PostProcessing,
    /// Factors valid, full rank.
    Factored,
    /// Factors valid, rejected columns replaced by slacks.
    Singular,
}

impl Task {
    pub(crate) fn has_factors(self) -> bool {
        matches!(self, Task::Factored | Task::Singular)
    }
}

/// Solves seen before the averages are recomputed.
pub(crate) const MINIMUM_SOLVES: f64 = 50.0;

/// Counters are scaled back by this factor after each recomputation.
pub(crate) const AVERAGE_SCALE_BACK: f64 = 0.8;

/// Ratio of active nonzeros to `rows_left^2` above which the remaining block
/// is factorized dense.
pub(crate) fn dense_ratio(rows_left: usize) -> f64 {
    if rows_left <= 256 {
        1.5
    } else if rows_left <= 800 {
        2.0
    } else if rows_left <= 2000 {
        3.0
    } else {
        4.0
    }
}
