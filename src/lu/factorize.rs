// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

use crate::lu::build_factors::build_factors;
use crate::lu::def::Task;
use crate::lu::dense::{factor_dense, want_to_go_dense};
use crate::lu::markowitz::{markowitz, Candidate};
use crate::lu::pivot::pivot;
use crate::lu::LU;
use crate::Status;
use log::{debug, trace, warn};
use std::time::Instant;

impl LU {
    /// Factorize the matrix `B` into its LU factors. Choose pivot elements by
    /// a Markowitz criterion subject to columnwise threshold pivoting (the
    /// pivot may not be smaller than a factor of the largest entry in its
    /// column).
    ///
    /// ## Arguments
    ///
    /// Column `j` of the `m x m` matrix `B` contains elements
    ///
    /// ```txt
    ///     b_index[b_begin[j] .. b_end[j]], b_value[b_begin[j] .. b_end[j]].
    /// ```
    ///
    /// Row indices must be below `m` and unique within a column, otherwise
    /// [`Status::InvalidArgument`] is returned. Values with magnitude at most
    /// `zero_tolerance` are ignored.
    ///
    /// ## Singularity
    ///
    /// Columns without an acceptable pivot are replaced by slack columns of
    /// the rows left over, paired in ascending order (see
    /// [`LU::singular_pairs`]). The factors are then valid for the modified
    /// matrix and [`Status::StructuralSingularity`] (a column was empty) or
    /// [`Status::NumericalSingularity`] is returned.
    pub fn factorize(
        &mut self,
        b_begin: &[usize],
        b_end: &[usize],
        b_index: &[usize],
        b_value: &[f64],
    ) -> Result<(), Status> {
        let tic = Instant::now();
        let m = b_begin.len();
        if b_end.len() != m || b_index.len() != b_value.len() {
            return Err(Status::InvalidArgument);
        }

        self.config.validate();
        self.reset();
        self.method = self.config.update_method;
        if self.stats.check_sparse(&mut self.averages) {
            debug!(
                "solve averages: ftran {:?}, btran {:?}",
                self.ftran_averages(),
                self.btran_averages()
            );
        }

        let nnz: usize = (0..m)
            .map(|j| b_end[j].saturating_sub(b_begin[j]))
            .sum();
        let room = usize::max((self.config.area_factor * nnz as f64) as usize, nnz);
        self.get_areas(m, m, room, room + m * (self.config.pad + 1))?;

        fn return_to_caller(
            tic: Instant,
            lu: &mut LU,
            status: Result<(), Status>,
        ) -> Result<(), Status> {
            let elapsed = tic.elapsed().as_secs_f64();
            lu.time_factorize += elapsed;
            lu.time_factorize_total += elapsed;
            if status.is_err() && !lu.task.has_factors() {
                lu.task = Task::NoTask;
            }
            status
        }

        self.task = Task::PreProcessing;
        loop {
            let task = self.task;
            let status = match task {
                Task::PreProcessing => self.pre_process(b_begin, b_end, b_index, b_value),
                Task::SparsePhase => self.factor_sparse(),
                Task::DensePhase => factor_dense(self).map(|()| {
                    self.task = Task::PostProcessing;
                }),
                Task::PostProcessing => self.post_process_factors(),
                Task::Factored | Task::Singular => break,
                Task::NoTask => Err(Status::InvalidCall),
            };
            if status.is_err() {
                return return_to_caller(tic, self, status);
            }
        }

        self.nexpand = self.a_cols.nexpand + self.a_rows.nexpand;
        self.ngarbage = self.a_cols.ngarbage + self.a_rows.ngarbage;
        self.nfactorize += 1;

        // factor_cost is a deterministic measure of the factorization cost.
        //
        // update_cost measures the accumulated cost of updates/solves compared
        // to the last factorization. It is computed from
        //
        //   update_cost = update_cost_numer / update_cost_denom.
        //
        // update_cost_denom is fixed here.
        // update_cost_numer is zero here and increased by solves/updates.
        let factor_cost = 0.04 * (m as f64)
            + 0.07 * (self.matrix_nz as f64)
            + 0.20 * (self.nsearch_pivot as f64)
            + 0.008 * (self.factor_flops as f64);
        self.update_cost_denom = f64::max(factor_cost * 250.0, 1.0);

        debug!(
            "factorized m={} nz={} l_nz={} u_nz={} rank={} dense={} flops={}",
            m, self.matrix_nz, self.l_nz, self.u_nz, self.rank, self.dense_size, self.factor_flops
        );

        let status = if self.task == Task::Singular {
            let structural = self.singular.iter().any(|&(k, _)| self.empty_input[k]);
            warn!(
                "basis singular: {} of {} columns replaced by slacks",
                self.singular.len(),
                m
            );
            if structural {
                Err(Status::StructuralSingularity)
            } else {
                Err(Status::NumericalSingularity)
            }
        } else {
            Ok(())
        };
        return_to_caller(tic, self, status)
    }

    /// Load the basis columns into the active submatrix and build the count
    /// lists.
    fn pre_process(
        &mut self,
        b_begin: &[usize],
        b_end: &[usize],
        b_index: &[usize],
        b_value: &[f64],
    ) -> Result<(), Status> {
        let m = self.m;
        let zero_tolerance = self.config.zero_tolerance;
        self.reserve_markers(m + 1);

        let mut row_nz = std::mem::take(&mut self.iwork);
        row_nz.clear();
        row_nz.resize(m + 1, 0);

        for j in 0..m {
            let (beg, end) = (b_begin[j], b_end[j]);
            if beg > end || end > b_index.len() {
                return Err(Status::InvalidArgument);
            }
            self.matrix_nz += end - beg;
            self.empty_input[j] = beg == end;
            let mark = self.next_marker();
            self.get_column_space_iterate(j, end - beg)?;
            let mut cmx: f64 = 0.0;
            for pos in beg..end {
                let i = b_index[pos];
                let x = b_value[pos];
                if i >= m || self.marked[i] == mark || !x.is_finite() {
                    return Err(Status::InvalidArgument);
                }
                self.marked[i] = mark;
                if x.abs() <= zero_tolerance {
                    continue;
                }
                self.a_cols.push(j, i, x);
                row_nz[i + 1] += 1;
                cmx = f64::max(cmx, x.abs());
            }
            self.col_max[j] = cmx;
            self.left_elements += self.a_cols.len(j);
            self.col_count.add(j, self.a_cols.len(j));
        }

        // row patterns, one row at a time
        for i in 0..m {
            row_nz[i + 1] += row_nz[i];
        }
        let mut pattern = vec![0; row_nz[m]];
        let mut put = row_nz.clone();
        for j in 0..m {
            for &i in self.a_cols.indices(j) {
                pattern[put[i]] = j;
                put[i] += 1;
            }
        }
        for i in 0..m {
            let cols = &pattern[row_nz[i]..row_nz[i + 1]];
            self.get_row_space_iterate(i, cols.len())?;
            for &j in cols {
                self.a_rows.push(i, j, 0.0);
            }
            self.row_count.add(i, cols.len());
        }
        row_nz.clear();
        self.iwork = row_nz;

        self.l_acc_begin.push(0);
        self.u_acc_begin.push(0);
        trace!("pre-processed {} columns, {} entries", m, self.left_elements);
        self.task = Task::SparsePhase;
        Ok(())
    }

    /// Markowitz pivoting until the active submatrix is exhausted or dense.
    fn factor_sparse(&mut self) -> Result<(), Status> {
        loop {
            debug_assert_eq!(self.left_elements, self.a_cols.live_nz());
            if want_to_go_dense(self) {
                self.task = Task::DensePhase;
                return Ok(());
            }
            match markowitz(self) {
                Candidate::Pivot { row, col } => {
                    trace!("pivot row {} column {}", row, col);
                    pivot(self, row, col)?;
                }
                Candidate::EmptyColumn(col) => {
                    debug!("column {} has no acceptable pivot", col);
                    self.reject_column(col);
                }
                Candidate::Exhausted => {
                    for col in 0..self.m {
                        if !self.col_done[col] {
                            self.reject_column(col);
                        }
                    }
                    self.task = Task::PostProcessing;
                    return Ok(());
                }
            }
        }
    }

    fn reject_column(&mut self, col: usize) {
        crate::lu::pivot::clear_column(self, col);
        self.col_count.remove(col);
        self.col_done[col] = true;
        self.rejected.push(col);
    }

    /// Pair leftover rows with rejected columns and build the final factors.
    fn post_process_factors(&mut self) -> Result<(), Status> {
        let m = self.m;
        self.rejected.sort_unstable();
        let leftover: Vec<usize> = (0..m).filter(|&i| !self.row_done[i]).collect();
        debug_assert_eq!(leftover.len(), self.rejected.len());

        self.rank = self.step_row.len();
        for (&row, &col) in leftover.iter().zip(&self.rejected) {
            self.step_row.push(row);
            self.step_col.push(col);
            self.step_pivot.push(1.0);
            self.l_acc_begin.push(self.l_acc_index.len());
            self.u_acc_begin.push(self.u_acc_index.len());
            self.row_done[row] = true;
            self.singular.push((col, row));
        }
        if self.step_row.len() != m {
            return Err(Status::InvalidCall);
        }

        build_factors(self)?;

        self.task = if self.singular.is_empty() {
            Task::Factored
        } else {
            Task::Singular
        };
        Ok(())
    }
}
