// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a column replacement is folded into the factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UpdateMethod {
    /// Row etas in R plus a permuted, spike-replaced U.
    #[default]
    ForrestTomlin,
    /// Column etas applied after the U solve. U is never modified.
    ProductForm,
}

/// Tuning parameters of the factorization engine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FactorConfig {
    /// Values with magnitude less than or equal to this are treated as exact
    /// zeros. A pivot must exceed it. Default: 1e-13
    pub zero_tolerance: f64,

    /// A pivot must be (in absolute value) at least `pivot_tolerance` times
    /// the largest entry in its column. Clamped to `[1e-4, 1.0]`.
    /// Default: 0.1
    pub pivot_tolerance: f64,

    /// The Markowitz search stops after this many rows or columns once an
    /// eligible pivot has been found. Default: 4
    pub search_limit: usize,

    /// The dense phase may take over once more than this many rows are
    /// left. 0 disables the dense phase. Default: 71
    pub dense_threshold: usize,

    /// A solve stage uses the sparse (depth first search) kernel when it
    /// expects at most `sparse_threshold * m` nonzeros. Default: 0.05
    pub sparse_threshold: f64,

    /// A solve stage uses the dense kernel when it expects more than
    /// `dense_solve_threshold * m` nonzeros. Default: 0.3
    pub dense_solve_threshold: f64,

    /// Number of column replacements allowed between factorizations.
    /// Default: 200
    pub maximum_pivots: usize,

    /// Multiplier on the accuracy tolerance of the replacement check.
    /// Default: 1.0
    pub relax_check: f64,

    /// When a line of the active submatrix must be moved, `pad + stretch * nz`
    /// slots of extra space are added for fill-in. Default: 4
    pub pad: usize,
    /// Default: 0.3
    pub stretch: f64,

    /// The U and R areas get `area_factor` times the factor size as room for
    /// updates. Default: 3.0
    pub area_factor: f64,

    pub update_method: UpdateMethod,
}

impl Default for FactorConfig {
    fn default() -> Self {
        Self {
            zero_tolerance: 1e-13,
            pivot_tolerance: 0.1,
            search_limit: 4,
            dense_threshold: 71,
            sparse_threshold: 0.05,
            dense_solve_threshold: 0.3,
            maximum_pivots: 200,
            relax_check: 1.0,
            pad: 4,
            stretch: 0.3,
            area_factor: 3.0,
            update_method: UpdateMethod::ForrestTomlin,
        }
    }
}

impl FactorConfig {
    /// Clamp out-of-range values to something usable.
    pub fn validate(&mut self) {
        if !(self.zero_tolerance > 0.0) {
            self.zero_tolerance = 1e-13;
        }
        self.pivot_tolerance = self.pivot_tolerance.clamp(1e-4, 1.0);
        self.search_limit = self.search_limit.max(1);
        self.sparse_threshold = self.sparse_threshold.clamp(0.0, 1.0);
        self.dense_solve_threshold = self.dense_solve_threshold.clamp(self.sparse_threshold, 1.0);
        self.relax_check = self.relax_check.max(1e-3);
        self.stretch = self.stretch.max(0.0);
        self.area_factor = self.area_factor.max(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_clamps_out_of_range_values() {
        let mut config = FactorConfig {
            zero_tolerance: -1.0,
            pivot_tolerance: 5.0,
            search_limit: 0,
            sparse_threshold: 0.5,
            dense_solve_threshold: 0.1,
            area_factor: 0.2,
            ..Default::default()
        };
        config.validate();
        assert_eq!(config.zero_tolerance, 1e-13);
        assert_eq!(config.pivot_tolerance, 1.0);
        assert_eq!(config.search_limit, 1);
        assert_eq!(config.dense_solve_threshold, 0.5);
        assert_eq!(config.area_factor, 1.0);
    }

    #[test]
    fn defaults_survive_validation() {
        let mut config = FactorConfig::default();
        config.validate();
        assert_eq!(config, FactorConfig::default());
    }
}
