// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

use crate::lu::def::Task;
use crate::lu::file::LineFile;
use crate::lu::list::CountLists;
use crate::lu::statistics::{SolveKind, SolveStatistics, StageAverages};
use crate::lu::workspace::Workspace;
use crate::{FactorConfig, IndexedVector, Status, UpdateMethod};

/// Sparse LU factorization of a square basis matrix with column replacement
/// updates.
///
/// All factors live in row space: every index stored in `L`, `U` and the
/// Forrest-Tomlin etas is a pivot row. `permute[r]` is the basis position
/// pivoted in row `r`.
#[derive(Debug, Clone, Default)]
pub struct LU {
    /// Tuning parameters. Validated at the start of each factorization.
    pub config: FactorConfig,

    pub(crate) m: usize,
    pub(crate) task: Task,

    // Active submatrix while factorizing. Column lines are basis positions,
    // row lines hold the column pattern of each row (values unused).
    pub(crate) a_cols: LineFile,
    pub(crate) a_rows: LineFile,
    pub(crate) col_count: CountLists, // m+2 lists, m+1 parks rows without eligible pivot
    pub(crate) row_count: CountLists,
    pub(crate) col_max: Vec<f64>,
    pub(crate) col_done: Vec<bool>,
    pub(crate) row_done: Vec<bool>,
    pub(crate) empty_input: Vec<bool>,
    pub(crate) marked: Vec<u32>,
    pub(crate) touched: Vec<u32>,
    pub(crate) marker: u32,
    pub(crate) work: Vec<f64>,
    pub(crate) iwork: Vec<usize>,

    // Elimination record. Step k pivots `step_col[k]` in `step_row[k]`; its
    // L column and U row (indexed by basis position) are stored in order.
    pub(crate) step_row: Vec<usize>,
    pub(crate) step_col: Vec<usize>,
    pub(crate) step_pivot: Vec<f64>,
    pub(crate) l_acc_begin: Vec<usize>,
    pub(crate) l_acc_index: Vec<usize>,
    pub(crate) l_acc_value: Vec<f64>,
    pub(crate) u_acc_begin: Vec<usize>,
    pub(crate) u_acc_index: Vec<usize>,
    pub(crate) u_acc_value: Vec<f64>,
    pub(crate) rejected: Vec<usize>,
    pub(crate) singular: Vec<(usize, usize)>, // (basis position, slack row)

    // Factors.
    pub(crate) l_cols: LineFile,
    pub(crate) l_rows: LineFile,
    pub(crate) l_order: Vec<usize>,
    pub(crate) u_cols: LineFile,
    pub(crate) u_rows: LineFile,
    pub(crate) pivot_order: CountLists,
    pub(crate) pivot_region: Vec<f64>,
    pub(crate) permute: Vec<usize>,
    pub(crate) permute_back: Vec<usize>,
    pub(crate) method: UpdateMethod, // fixed at factorization

    // Update etas. Eta k has entries `r_start[k]..r_start[k+1]` and pivot
    // `r_pivot[k]`: a pivot row for Forrest-Tomlin etas, a basis position
    // with pivot value `r_alpha[k]` for product form etas.
    pub(crate) r_start: Vec<usize>,
    pub(crate) r_index: Vec<usize>,
    pub(crate) r_value: Vec<f64>,
    pub(crate) r_pivot: Vec<usize>,
    pub(crate) r_alpha: Vec<f64>,
    pub(crate) r_capacity: usize,

    // Pending update.
    pub(crate) spike: IndexedVector,
    pub(crate) spike_ready: bool,
    pub(crate) eta_row: Option<usize>,
    pub(crate) eta_index: Vec<usize>,
    pub(crate) eta_value: Vec<f64>,
    pub(crate) ft_alpha: f64,

    pub(crate) ws: Workspace,
    pub(crate) stats: SolveStatistics,
    pub(crate) averages: [StageAverages; 3],

    // user readable //
    pub(crate) nupdate: usize,
    pub(crate) nforrest: usize,
    pub(crate) nfactorize: usize,
    pub(crate) nupdate_total: usize,
    pub(crate) nforrest_total: usize,
    pub(crate) l_nz: usize, // nz in L excluding diagonal
    pub(crate) u_nz: usize, // nz in U excluding diagonal
    pub(crate) r_nz: usize, // nz in update etas excluding diagonal
    pub(crate) matrix_nz: usize,
    pub(crate) left_elements: usize, // nz in the active submatrix
    pub(crate) rank: usize,
    pub(crate) dense_size: usize,
    pub(crate) min_pivot: f64,
    pub(crate) max_pivot: f64,
    pub(crate) max_eta: f64,
    pub(crate) pivot_error: f64,
    pub(crate) update_cost_numer: f64,
    pub(crate) update_cost_denom: f64,
    pub(crate) nsearch_pivot: usize,
    pub(crate) nexpand: usize,
    pub(crate) ngarbage: usize,
    pub(crate) factor_flops: usize,
    pub(crate) time_factorize: f64,
    pub(crate) time_update: f64,
    pub(crate) time_factorize_total: f64,
    pub(crate) time_solve_total: f64,
    pub(crate) time_update_total: f64,
    pub(crate) time_search_pivot: f64,
    pub(crate) time_elim_pivot: f64,
}

impl LU {
    pub fn new(config: FactorConfig) -> Self {
        let mut lu = LU {
            config,
            update_cost_denom: 1.0,
            ..Default::default()
        };
        lu.config.validate();
        lu
    }

    /// Invalidate the current factorization and zero the per-factorization
    /// counters. Totals and solve statistics survive.
    pub fn reset(&mut self) {
        self.task = Task::NoTask;
        self.nupdate = 0;
        self.nforrest = 0;
        self.l_nz = 0;
        self.u_nz = 0;
        self.r_nz = 0;
        self.matrix_nz = 0;
        self.left_elements = 0;
        self.rank = 0;
        self.dense_size = 0;
        self.min_pivot = 0.0;
        self.max_pivot = 0.0;
        self.max_eta = 0.0;
        self.pivot_error = 0.0;
        self.update_cost_numer = 0.0;
        self.update_cost_denom = 1.0;
        self.nsearch_pivot = 0;
        self.nexpand = 0;
        self.ngarbage = 0;
        self.factor_flops = 0;
        self.time_factorize = 0.0;
        self.time_update = 0.0;
        self.time_search_pivot = 0.0;
        self.time_elim_pivot = 0.0;

        self.step_row.clear();
        self.step_col.clear();
        self.step_pivot.clear();
        self.l_acc_begin.clear();
        self.l_acc_index.clear();
        self.l_acc_value.clear();
        self.u_acc_begin.clear();
        self.u_acc_index.clear();
        self.u_acc_value.clear();
        self.rejected.clear();
        self.singular.clear();

        self.r_start.clear();
        self.r_index.clear();
        self.r_value.clear();
        self.r_pivot.clear();
        self.r_alpha.clear();
        self.spike_ready = false;
        self.eta_row = None;
    }

    /// Size all arrays for a factorization of `number_rows` rows and
    /// `number_columns` basis columns. `maximum_l` and `maximum_u` are the
    /// initial capacities of the elimination record and of the active
    /// submatrix; both grow on demand while factorizing.
    pub fn get_areas(
        &mut self,
        number_rows: usize,
        number_columns: usize,
        maximum_l: usize,
        maximum_u: usize,
    ) -> Result<(), Status> {
        if number_rows != number_columns {
            return Err(Status::InvalidArgument);
        }
        let m = number_rows;
        self.m = m;

        let config = &self.config;
        self.a_cols = LineFile::new(m, 0, config.pad, config.stretch);
        self.a_rows = LineFile::new(m, 0, config.pad, config.stretch);
        self.a_cols.grow(maximum_u)?;
        self.a_rows.grow(maximum_u)?;

        reserve(&mut self.l_acc_index, maximum_l)?;
        reserve(&mut self.l_acc_value, maximum_l)?;
        reserve(&mut self.u_acc_index, maximum_u)?;
        reserve(&mut self.u_acc_value, maximum_u)?;
        reserve(&mut self.step_row, m)?;
        reserve(&mut self.step_col, m)?;
        reserve(&mut self.step_pivot, m)?;
        reserve(&mut self.l_acc_begin, m + 1)?;
        reserve(&mut self.u_acc_begin, m + 1)?;

        self.col_count.init(m, m + 2);
        self.row_count.init(m, m + 2);
        resize(&mut self.col_max, m, 0.0)?;
        resize(&mut self.col_done, m, false)?;
        resize(&mut self.row_done, m, false)?;
        resize(&mut self.empty_input, m, false)?;
        resize(&mut self.work, m, 0.0)?;
        resize(&mut self.marked, m, 0)?;
        resize(&mut self.touched, m, 0)?;
        self.marker = 0;

        resize(&mut self.pivot_region, m, 0.0)?;
        resize(&mut self.permute, m, 0)?;
        resize(&mut self.permute_back, m, 0)?;
        self.spike = IndexedVector::new(m);
        self.ws.ensure(m);
        Ok(())
    }

    /// Make room for `extra_needed` more entries in column line `column` of
    /// `U`. Returns false if the U area is exhausted.
    pub fn get_column_space(&mut self, column: usize, extra_needed: usize) -> bool {
        self.u_cols.get_space(column, extra_needed)
    }

    /// Make room for `extra_needed` more entries in row line `row` of `U`.
    pub fn get_row_space(&mut self, row: usize, extra_needed: usize) -> bool {
        self.u_rows.get_space(row, extra_needed)
    }

    /// Make room in the active submatrix while factorizing, growing the file
    /// if needed.
    pub(crate) fn get_column_space_iterate(
        &mut self,
        column: usize,
        extra_needed: usize,
    ) -> Result<(), Status> {
        self.a_cols.get_space_iterate(column, extra_needed)
    }

    pub(crate) fn get_row_space_iterate(
        &mut self,
        row: usize,
        extra_needed: usize,
    ) -> Result<(), Status> {
        self.a_rows.get_space_iterate(row, extra_needed)
    }

    /// Fresh stamp for `marked`/`touched`.
    pub(crate) fn next_marker(&mut self) -> u32 {
        self.reserve_markers(1);
        self.marker += 1;
        self.marker
    }

    /// Reset the stamps if fewer than `count` fresh ones are left, so that
    /// the next `count` calls of `next_marker` keep older stamps valid.
    pub(crate) fn reserve_markers(&mut self, count: usize) {
        if (u32::MAX - self.marker) as usize <= count {
            self.marked.fill(0);
            self.touched.fill(0);
            self.marker = 0;
        }
    }

    /// Merge the counters of a workspace used with the `_with` solves.
    pub fn absorb(&mut self, ws: &mut Workspace) {
        self.update_cost_numer += ws.stats.flops() as f64;
        self.time_solve_total += ws.stats.time_solve;
        self.stats.absorb(&mut ws.stats);
    }

    /// Deterministic measure of solve/update cost compared to cost of last
    /// factorization. This value is zero after factorization and monotonically
    /// increases with solves/updates. When > 1.0, then a refactorization is
    /// good for performance.
    pub fn update_cost(&self) -> f64 {
        self.update_cost_numer / self.update_cost_denom
    }

    /// Matrix dimension.
    pub fn m(&self) -> usize {
        self.m
    }

    /// True if the factors can be used for solves.
    pub fn is_factored(&self) -> bool {
        self.task.has_factors()
    }

    /// Number of column replacements since last factorization.
    pub fn number_pivots(&self) -> usize {
        self.nupdate
    }

    /// Number of Forrest-Tomlin updates since last factorization.
    pub fn number_forrest_tomlin(&self) -> usize {
        self.nforrest
    }

    /// Number of factorizations since initialization.
    pub fn nfactorize(&self) -> usize {
        self.nfactorize
    }

    /// Number of updates since initialization.
    pub fn nupdate_total(&self) -> usize {
        self.nupdate_total
    }

    /// Number of Forrest-Tomlin updates since initialization.
    pub fn nforrest_total(&self) -> usize {
        self.nforrest_total
    }

    /// Reciprocal pivot of every row.
    pub fn pivot_region(&self) -> &[f64] {
        &self.pivot_region
    }

    /// Basis position pivoted in each row.
    pub fn permute(&self) -> &[usize] {
        &self.permute
    }

    /// Row in which each basis position is pivoted.
    pub fn permute_back(&self) -> &[usize] {
        &self.permute_back
    }

    /// Number of stored entries: the pivots plus the off-diagonal entries
    /// of `L`, `U` and the update etas.
    pub fn number_elements(&self) -> usize {
        self.m + self.l_nz + self.u_nz + self.r_nz
    }

    /// Number of nonzeros in `L` excluding diagonal elements (not changed by updates).
    pub fn l_nz(&self) -> usize {
        self.l_nz
    }

    /// Number of nonzeros in `U` excluding diagonal elements (changed by updates).
    pub fn u_nz(&self) -> usize {
        self.u_nz
    }

    /// Number of nonzeros in update etas excluding their pivots.
    pub fn r_nz(&self) -> usize {
        self.r_nz
    }

    /// Number of nonzeros in the basis matrix when factorized.
    pub fn matrix_nz(&self) -> usize {
        self.matrix_nz
    }

    /// Number of pivot steps on basis columns. Less than `m` if columns were
    /// replaced by slacks.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Basis positions rejected by the last factorization together with the
    /// rows whose slacks replaced them.
    pub fn singular_pairs(&self) -> &[(usize, usize)] {
        &self.singular
    }

    /// Dimension of the block factorized dense, 0 if the dense phase did not run.
    pub fn dense_size(&self) -> usize {
        self.dense_size
    }

    /// The smallest pivot element after factorization.
    /// Replaced when a smaller pivot occurs in an update.
    pub fn min_pivot(&self) -> f64 {
        self.min_pivot
    }

    /// The largest pivot element after factorization.
    /// Replaced when a larger pivot occurs in an update.
    pub fn max_pivot(&self) -> f64 {
        self.max_pivot
    }

    /// The maximum entry (in absolute value) in the eta vectors from the
    /// Forrest-Tomlin update. A large value, say > 1e6, indicates that pivoting
    /// on diagonal element was unstable and refactorization might be necessary.
    pub fn max_eta(&self) -> f64 {
        self.max_eta
    }

    /// A measure for numerical stability. It is the difference between two
    /// computations of the new pivot element relative to the new pivot element.
    /// A value larger than 1e-10 indicates numerical instability and suggests
    /// refactorization (and possibly tightening the pivot tolerance).
    pub fn pivot_error(&self) -> f64 {
        self.pivot_error
    }

    /// Total number of columns/rows searched for pivots.
    pub fn nsearch_pivot(&self) -> usize {
        self.nsearch_pivot
    }

    /// Number of lines moved to the end of the active submatrix files.
    pub fn nexpand(&self) -> usize {
        self.nexpand
    }

    /// Number of compressions of the active submatrix files.
    pub fn ngarbage(&self) -> usize {
        self.ngarbage
    }

    /// Number of floating point operations performed in factorize,
    /// counting multiply-add as one flop.
    pub fn factor_flops(&self) -> usize {
        self.factor_flops
    }

    /// Expected nonzero growth over the stages of FTRAN.
    pub fn ftran_averages(&self) -> StageAverages {
        self.averages[SolveKind::Ftran as usize]
    }

    /// Expected nonzero growth over the stages of the FTRAN that saves a spike.
    pub fn ftran_ft_averages(&self) -> StageAverages {
        self.averages[SolveKind::FtranFt as usize]
    }

    /// Expected nonzero growth over the stages of BTRAN.
    pub fn btran_averages(&self) -> StageAverages {
        self.averages[SolveKind::Btran as usize]
    }

    /// Flops for operations with `L`, `U` and the etas in all absorbed solves.
    pub fn solve_flops(&self) -> (usize, usize, usize) {
        (self.stats.l_flops, self.stats.u_flops, self.stats.r_flops)
    }

    /// Wall clock time for last factorization.
    pub fn time_factorize(&self) -> f64 {
        self.time_factorize
    }

    /// Wall clock time for all solves absorbed since initialization.
    pub fn time_solve_total(&self) -> f64 {
        self.time_solve_total
    }

    /// Wall clock time for all updates since last factorization.
    pub fn time_update(&self) -> f64 {
        self.time_update
    }

    /// Analogous to above, but summing up all calls since initialization.
    pub fn time_factorize_total(&self) -> f64 {
        self.time_factorize_total
    }

    /// Analogous to above, but summing up all calls since initialization.
    pub fn time_update_total(&self) -> f64 {
        self.time_update_total
    }

    /// Wall clock time for Markowitz search.
    pub fn time_search_pivot(&self) -> f64 {
        self.time_search_pivot
    }

    /// Wall clock time for pivot elimination.
    pub fn time_elim_pivot(&self) -> f64 {
        self.time_elim_pivot
    }
}

pub(crate) fn reserve<T>(v: &mut Vec<T>, capacity: usize) -> Result<(), Status> {
    v.clear();
    v.try_reserve_exact(capacity)
        .map_err(|_| Status::OutOfMemory)
}

pub(crate) fn resize<T: Clone>(v: &mut Vec<T>, len: usize, value: T) -> Result<(), Status> {
    v.clear();
    v.try_reserve_exact(len).map_err(|_| Status::OutOfMemory)?;
    v.resize(len, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_areas_rejects_non_square() {
        let mut lu = LU::new(FactorConfig::default());
        assert_eq!(lu.get_areas(3, 2, 10, 10), Err(Status::InvalidArgument));
        assert_eq!(lu.get_areas(3, 3, 10, 10), Ok(()));
        assert!(lu.a_cols.capacity() >= 10);
        assert_eq!(lu.pivot_region.len(), 3);
    }

    #[test]
    fn get_areas_reports_out_of_memory() {
        let mut lu = LU::new(FactorConfig::default());
        assert_eq!(
            lu.get_areas(2, 2, usize::MAX / 2, 4),
            Err(Status::OutOfMemory)
        );
    }

    #[test]
    fn fresh_engine_is_not_factored() {
        let lu = LU::new(FactorConfig::default());
        assert!(!lu.is_factored());
        assert_eq!(lu.update_cost(), 0.0);
    }
}
