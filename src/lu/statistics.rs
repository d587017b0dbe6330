// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln
//
// Moving averages of the nonzero counts seen by the solve stages. They decide
// which triangular kernel a stage uses. A wrong choice costs time only.

use crate::lu::def::{AVERAGE_SCALE_BACK, MINIMUM_SOLVES};
use crate::FactorConfig;

/// Triangular solve kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kernel {
    /// Depth first search for the result pattern, then numeric work over it.
    Sparse,
    /// Sweep the pivot order, skip zeros and collect the pattern on the way.
    Densish,
    /// Sweep the pivot order and rebuild the pattern by scanning afterwards.
    Dense,
}

impl Kernel {
    /// Kernel for a stage expected to produce `expected` nonzeros out of `m`.
    pub(crate) fn choose(expected: f64, m: usize, config: &FactorConfig) -> Self {
        let m = m as f64;
        if expected <= config.sparse_threshold * m {
            Kernel::Sparse
        } else if expected <= config.dense_solve_threshold * m {
            Kernel::Densish
        } else {
            Kernel::Dense
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SolveKind {
    Ftran = 0,
    FtranFt = 1,
    Btran = 2,
}

/// Nonzeros summed over solves: on input, after the first triangular factor,
/// after the update etas and after the second triangular factor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct StageCounts {
    pub(crate) solves: f64,
    pub(crate) input: f64,
    pub(crate) after_first: f64,
    pub(crate) after_r: f64,
    pub(crate) after_last: f64,
}

impl StageCounts {
    fn add(&mut self, other: &StageCounts) {
        self.solves += other.solves;
        self.input += other.input;
        self.after_first += other.after_first;
        self.after_r += other.after_r;
        self.after_last += other.after_last;
    }

    fn scale(&mut self, factor: f64) {
        self.solves *= factor;
        self.input *= factor;
        self.after_first *= factor;
        self.after_r *= factor;
        self.after_last *= factor;
    }
}

/// Expected growth of the nonzero count over each stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageAverages {
    pub after_first: f64,
    pub after_r: f64,
    pub after_last: f64,
}

impl Default for StageAverages {
    fn default() -> Self {
        Self {
            after_first: 1.0,
            after_r: 1.0,
            after_last: 1.0,
        }
    }
}

fn growth(after: f64, before: f64) -> f64 {
    if before > 0.0 {
        f64::max(after / before, 1.0)
    } else {
        1.0
    }
}

/// Counters collected while solving. Each [`crate::Workspace`] owns one set;
/// the engine merges them with [`SolveStatistics::absorb`].
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SolveStatistics {
    pub(crate) counts: [StageCounts; 3],
    pub(crate) l_flops: usize,
    pub(crate) u_flops: usize,
    pub(crate) r_flops: usize,
    pub(crate) time_solve: f64,
}

impl SolveStatistics {
    pub(crate) fn record(&mut self, kind: SolveKind, nnz: [usize; 4]) {
        let counts = &mut self.counts[kind as usize];
        counts.solves += 1.0;
        counts.input += nnz[0] as f64;
        counts.after_first += nnz[1] as f64;
        counts.after_r += nnz[2] as f64;
        counts.after_last += nnz[3] as f64;
    }

    /// Move the counters of `other` into `self`, leaving `other` zeroed.
    pub(crate) fn absorb(&mut self, other: &mut SolveStatistics) {
        for (mine, theirs) in self.counts.iter_mut().zip(&other.counts) {
            mine.add(theirs);
        }
        self.l_flops += other.l_flops;
        self.u_flops += other.u_flops;
        self.r_flops += other.r_flops;
        self.time_solve += other.time_solve;
        *other = SolveStatistics::default();
    }

    pub(crate) fn flops(&self) -> usize {
        self.l_flops + self.u_flops + self.r_flops
    }

    /// Recompute `averages` from counters with enough solves and scale those
    /// counters back. Returns true if any average changed.
    pub(crate) fn check_sparse(&mut self, averages: &mut [StageAverages; 3]) -> bool {
        let mut changed = false;
        for (counts, average) in self.counts.iter_mut().zip(averages.iter_mut()) {
            if counts.solves <= MINIMUM_SOLVES {
                continue;
            }
            let updated = StageAverages {
                after_first: growth(counts.after_first, counts.input),
                after_r: growth(counts.after_r, counts.after_first),
                after_last: growth(counts.after_last, counts.after_r),
            };
            changed |= updated != *average;
            *average = updated;
            counts.scale(AVERAGE_SCALE_BACK);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_need_enough_solves() {
        let mut stats = SolveStatistics::default();
        let mut averages = [StageAverages::default(); 3];
        for _ in 0..50 {
            stats.record(SolveKind::Ftran, [2, 4, 4, 8]);
        }
        assert!(!stats.check_sparse(&mut averages));
        assert_eq!(averages[0], StageAverages::default());

        stats.record(SolveKind::Ftran, [2, 4, 4, 8]);
        assert!(stats.check_sparse(&mut averages));
        assert_eq!(averages[0].after_first, 2.0);
        assert_eq!(averages[0].after_r, 1.0);
        assert_eq!(averages[0].after_last, 2.0);
        assert_eq!(stats.counts[0].solves, 51.0 * 0.8);
        // other kinds are untouched
        assert_eq!(averages[2], StageAverages::default());
    }

    #[test]
    fn shrinking_stages_average_to_one() {
        let mut stats = SolveStatistics::default();
        let mut averages = [StageAverages::default(); 3];
        for _ in 0..60 {
            stats.record(SolveKind::Btran, [10, 5, 5, 2]);
        }
        stats.check_sparse(&mut averages);
        assert_eq!(averages[2], StageAverages::default());
    }

    #[test]
    fn absorb_moves_counters() {
        let mut engine = SolveStatistics::default();
        let mut worker = SolveStatistics::default();
        worker.record(SolveKind::FtranFt, [1, 2, 3, 4]);
        worker.l_flops = 7;
        engine.absorb(&mut worker);
        assert_eq!(engine.counts[1].after_last, 4.0);
        assert_eq!(engine.flops(), 7);
        assert_eq!(worker, SolveStatistics::default());
    }

    #[test]
    fn kernel_thresholds() {
        let config = FactorConfig::default();
        assert_eq!(Kernel::choose(5.0, 100, &config), Kernel::Sparse);
        assert_eq!(Kernel::choose(20.0, 100, &config), Kernel::Densish);
        assert_eq!(Kernel::choose(31.0, 100, &config), Kernel::Dense);
    }
}
