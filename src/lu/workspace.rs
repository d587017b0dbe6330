// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

use crate::lu::statistics::SolveStatistics;

/// Scratch memory for solves against a factorization.
///
/// The factors are read-only while solving, so any number of threads may
/// solve concurrently against one [`crate::LU`] as long as each uses its own
/// workspace. Counters gathered here reach the engine through
/// [`crate::LU::absorb`].
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub(crate) work: Vec<f64>,
    pub(crate) xi: Vec<usize>,
    pub(crate) pstack: Vec<usize>,
    pub(crate) marked: Vec<u32>,
    pub(crate) marker: u32,
    pub(crate) stats: SolveStatistics,
}

impl Workspace {
    pub fn new(m: usize) -> Self {
        let mut ws = Self::default();
        ws.ensure(m);
        ws
    }

    /// Grow the buffers for dimension `m`.
    pub(crate) fn ensure(&mut self, m: usize) {
        if self.work.len() < m {
            self.work.resize(m, 0.0);
            self.xi.resize(m, 0);
            self.pstack.resize(m, 0);
            self.marked.resize(m, 0);
        }
    }

    /// Fresh stamp for `marked`. Stamps older than the returned value count
    /// as unmarked.
    pub(crate) fn next_marker(&mut self) -> u32 {
        if self.marker == u32::MAX {
            self.marked.fill(0);
            self.marker = 0;
        }
        self.marker += 1;
        self.marker
    }
}
