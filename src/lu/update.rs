// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln
//
// Column replacement: Forrest-Tomlin update or product form update.

use crate::lu::LU;
use crate::{IndexedVector, ReplaceStatus, Status, UpdateMethod};
use log::{debug, warn};
use std::time::Instant;

// Forrest-Tomlin update in row space
//
// Replacing the basis column pivoted in row r_p by the entering column turns
// column r_p of U into the spike s (the entering column after L and the
// previous etas). Row r_p of U is eliminated with the rows that follow r_p in
// pivot order. The multipliers form a row eta
//
//     eta[r'] = w[r'] / u[r'][r'],   w = U[r_p, :] updated as rows are eliminated,
//
// and the new diagonal element is
//
//     ft_alpha = s[r_p] - sum eta[r'] s[r'].
//
// Row r_p then moves to the end of the pivot order, which keeps U triangular.
//
// Product form update
//
// The FTRAN result alpha of the entering column becomes a column eta with
// pivot position p. U and L are not changed.

/// Below this magnitude a Forrest-Tomlin diagonal is not computed reliably.
const TINY_PIVOT: f64 = 1e-8;

/// Relative disagreement of the FTRAN and BTRAN pivots beyond which the
/// update is rejected.
const DRIFT_REJECT: f64 = 1e-4;

/// Relative disagreement of the FTRAN and BTRAN pivots beyond which the
/// update is only probably ok.
const DRIFT_WARN: f64 = 1e-8;

/// U files are compacted after an update once gaps take this share of the
/// used space.
const COMPRESS_THRESHOLD: f64 = 0.5;

impl LU {
    /// Check that the update areas have room for one more column replacement
    /// with the saved spike.
    pub fn space_for_forrest_tomlin(&self) -> bool {
        let m = self.m;
        if self.r_index.len() + m >= self.r_capacity {
            return false;
        }
        if self.method == UpdateMethod::ProductForm {
            return true;
        }
        // The spike column plus one new entry per row, after a compression
        // that leaves `pad` slots per line.
        let need = self.spike.nnz() + (self.config.pad + 1) * m + 1;
        self.u_cols.capacity() >= self.u_nz + need && self.u_rows.capacity() >= self.u_nz + need
    }

    /// First part of a column replacement: compute the new diagonal element
    /// for the leaving basis position `pivot_row` (the index of the leaving
    /// variable in FTRAN results).
    ///
    /// Requires a spike saved by [`LU::update_column_ft`]. For Forrest-Tomlin
    /// the row eta is computed and kept for [`LU::replace_column_part3`]. For
    /// the product form the new pivot is the spike entry itself.
    pub fn check_replace_part1(&mut self, pivot_row: usize) -> Result<f64, Status> {
        if !self.task.has_factors() || !self.spike_ready {
            return Err(Status::InvalidCall);
        }
        if pivot_row >= self.m {
            return Err(Status::InvalidArgument);
        }
        match self.method {
            UpdateMethod::ProductForm => Ok(self.spike.get(pivot_row)),
            UpdateMethod::ForrestTomlin => Ok(self.compute_row_eta(self.permute_back[pivot_row])),
        }
    }

    /// Eliminate U row `rp` with the rows after it in pivot order. Stores the
    /// multipliers in `eta_index`/`eta_value` and returns the new diagonal.
    fn compute_row_eta(&mut self, rp: usize) -> f64 {
        let m = self.m;
        let tol = self.config.zero_tolerance;
        let mut ws = std::mem::take(&mut self.ws);
        ws.ensure(m);
        let marker = ws.next_marker();

        // Number of marked rows whose entry in w has not been consumed. The
        // walk stops when none are left.
        let mut pending = 0;
        let (index, value) = self.u_rows.line(rp);
        for (&j, &x) in index.iter().zip(value) {
            ws.work[j] = x;
            ws.marked[j] = marker;
            pending += 1;
        }

        self.eta_index.clear();
        self.eta_value.clear();
        let mut ft_alpha = self.spike.get(rp);
        let mut flops = 0;
        let mut next = self.pivot_order.next(rp);
        while let Some(r) = next {
            if pending == 0 {
                break;
            }
            next = self.pivot_order.next(r);
            if ws.marked[r] != marker {
                continue;
            }
            pending -= 1;
            let w = ws.work[r];
            ws.work[r] = 0.0;
            let eta = w * self.pivot_region[r];
            if eta.abs() <= tol {
                continue;
            }
            self.eta_index.push(r);
            self.eta_value.push(eta);
            ft_alpha -= eta * self.spike.get(r);
            let (index, value) = self.u_rows.line(r);
            for (&j, &u) in index.iter().zip(value) {
                if ws.marked[j] != marker {
                    ws.marked[j] = marker;
                    pending += 1;
                }
                ws.work[j] -= eta * u;
            }
            flops += index.len();
        }
        // U row entries point to later rows only, so every marked row was
        // visited and `work` is clean again.
        debug_assert_eq!(pending, 0);

        self.update_cost_numer += flops as f64;
        self.ws = ws;
        self.eta_row = Some(rp);
        self.ft_alpha = ft_alpha;
        ft_alpha
    }

    /// Second part of a column replacement: grade the new pivot.
    ///
    /// `ftran_alpha` is the entry of the FTRAN'd entering column in the
    /// leaving position, `btran_alpha` the same value computed from the
    /// BTRAN'd row (pass `ftran_alpha` if not available) and `ft_alpha` the
    /// result of [`LU::check_replace_part1`]. Nothing is modified.
    pub fn check_replace_part2(
        &self,
        pivot_row: usize,
        btran_alpha: f64,
        ftran_alpha: f64,
        ft_alpha: f64,
        acceptable_pivot: f64,
    ) -> ReplaceStatus {
        if !self.space_for_forrest_tomlin() {
            return ReplaceStatus::NoRoom;
        }
        if self.nupdate >= self.config.maximum_pivots {
            return ReplaceStatus::MaximumPivots;
        }
        if pivot_row >= self.m || ftran_alpha.abs() < acceptable_pivot {
            return ReplaceStatus::Singular;
        }
        let pivot_check = match self.method {
            UpdateMethod::ForrestTomlin => {
                ftran_alpha / self.pivot_region[self.permute_back[pivot_row]]
            }
            UpdateMethod::ProductForm => ftran_alpha,
        };
        let mut status = self.check_pivot(ft_alpha, pivot_check);
        if status == ReplaceStatus::ProbablyOk && self.nupdate == 0 {
            status = ReplaceStatus::Singular;
        }
        if status == ReplaceStatus::Singular {
            return status;
        }

        let drift = (btran_alpha - ftran_alpha).abs() / (1.0 + ftran_alpha.abs());
        if drift > DRIFT_REJECT {
            debug!(
                "pivot disagreement: btran {:e} ftran {:e}",
                btran_alpha, ftran_alpha
            );
            return ReplaceStatus::Singular;
        }
        if drift > DRIFT_WARN {
            status = status.max(ReplaceStatus::ProbablyOk);
        }
        status
    }

    /// Compare the new diagonal `save_from_u` with the same value computed as
    /// `ftran_alpha` times the old pivot. The tolerance tightens with the
    /// number of updates since factorization.
    fn check_pivot(&self, save_from_u: f64, pivot_check: f64) -> ReplaceStatus {
        if save_from_u.abs() <= TINY_PIVOT {
            return ReplaceStatus::Singular;
        }
        let tolerance = self.config.relax_check
            * match self.nupdate {
                0..=1 => 1.0e-5,
                2..=9 => 1.0e-6,
                10..=49 => 1.0e-8,
                _ => 1.0e-10,
            };
        let test = (1.0 - (save_from_u / pivot_check).abs()).abs();
        if test < tolerance {
            ReplaceStatus::Ok
        } else if (pivot_check.abs() - save_from_u.abs()).abs() < 1.0e-12 || test < 1.0e-8 {
            ReplaceStatus::ProbablyOk
        } else {
            ReplaceStatus::Singular
        }
    }

    /// Third part of a column replacement: commit the update for the leaving
    /// basis position `pivot_row`. `alpha` is the FTRAN'd entry of the
    /// entering column in the leaving position; it only feeds
    /// [`LU::pivot_error`].
    pub fn replace_column_part3(&mut self, pivot_row: usize, alpha: f64) -> Result<(), Status> {
        let tic = Instant::now();
        if !self.task.has_factors() || !self.spike_ready {
            return Err(Status::InvalidCall);
        }
        if pivot_row >= self.m {
            return Err(Status::InvalidArgument);
        }
        if !self.space_for_forrest_tomlin() {
            return Err(Status::StorageExhaustion);
        }
        match self.method {
            UpdateMethod::ForrestTomlin => {
                let rp = self.permute_back[pivot_row];
                if self.eta_row != Some(rp) {
                    self.compute_row_eta(rp);
                }
                self.replace_forrest_tomlin(rp, alpha)?;
            }
            UpdateMethod::ProductForm => self.replace_product_form(pivot_row, alpha)?,
        }

        self.nupdate += 1;
        self.nupdate_total += 1;
        self.spike_ready = false;
        self.eta_row = None;

        let elapsed = tic.elapsed().as_secs_f64();
        self.time_update += elapsed;
        self.time_update_total += elapsed;

        #[cfg(feature = "debug")]
        {
            assert_eq!(self.u_rows.diff(&self.u_cols, true), 0);
            assert_eq!(self.u_cols.live_nz(), self.u_nz);
        }
        Ok(())
    }

    fn replace_forrest_tomlin(&mut self, rp: usize, alpha: f64) -> Result<(), Status> {
        let tol = self.config.zero_tolerance;
        let ft_alpha = self.ft_alpha;
        if ft_alpha.abs() <= tol {
            return Err(Status::NumericalSingularity);
        }
        let old_pivot = 1.0 / self.pivot_region[rp];
        self.pivot_error = (ft_alpha - alpha * old_pivot).abs() / ft_alpha.abs();

        // old column rp out of U
        for pos in self.u_cols.begin[rp]..self.u_cols.end[rp] {
            let i = self.u_cols.index[pos];
            self.u_rows.remove(i, rp);
        }
        self.u_nz -= self.u_cols.len(rp);
        self.u_cols.clear_line(rp);

        // row rp is eliminated by the eta
        for pos in self.u_rows.begin[rp]..self.u_rows.end[rp] {
            let j = self.u_rows.index[pos];
            self.u_cols.remove(j, rp);
        }
        self.u_nz -= self.u_rows.len(rp);
        self.u_rows.clear_line(rp);

        // spike becomes column rp
        let spike = std::mem::take(&mut self.spike);
        let count = spike
            .index()
            .iter()
            .filter(|&&i| i != rp && spike.get(i).abs() > tol)
            .count();
        if !self.get_column_space(rp, count) {
            self.spike = spike;
            return Err(Status::StorageExhaustion);
        }
        for &i in spike.index() {
            let x = spike.get(i);
            if i == rp || x.abs() <= tol {
                continue;
            }
            if !self.get_row_space(i, 1) {
                self.spike = spike;
                return Err(Status::StorageExhaustion);
            }
            self.u_cols.push(rp, i, x);
            self.u_rows.push(i, rp, x);
            self.u_nz += 1;
        }
        self.spike = spike;

        let u_nz = self.u_nz;
        for file in [&mut self.u_cols, &mut self.u_rows] {
            if (file.used() - u_nz) as f64 > COMPRESS_THRESHOLD * file.used() as f64 {
                file.cleanup();
            }
        }

        self.pivot_region[rp] = 1.0 / ft_alpha;
        self.pivot_order.move_to(rp, 0);
        self.min_pivot = f64::min(self.min_pivot, ft_alpha.abs());
        self.max_pivot = f64::max(self.max_pivot, ft_alpha.abs());

        let mut max_eta: f64 = 0.0;
        for (&r, &eta) in self.eta_index.iter().zip(&self.eta_value) {
            self.r_index.push(r);
            self.r_value.push(eta);
            max_eta = max_eta.max(eta.abs());
        }
        self.r_pivot.push(rp);
        self.r_alpha.push(1.0);
        self.r_start.push(self.r_index.len());
        self.r_nz += self.eta_index.len();
        self.max_eta = self.max_eta.max(max_eta);
        self.update_cost_numer += (count + self.eta_index.len()) as f64;
        self.nforrest += 1;
        self.nforrest_total += 1;
        Ok(())
    }

    fn replace_product_form(&mut self, p: usize, alpha: f64) -> Result<(), Status> {
        let tol = self.config.zero_tolerance;
        let alpha_p = self.spike.get(p);
        if alpha_p.abs() <= tol {
            return Err(Status::NumericalSingularity);
        }
        self.pivot_error = (alpha_p - alpha).abs() / alpha_p.abs();

        let mut max_eta: f64 = 0.0;
        let mut count = 0;
        for &i in self.spike.index() {
            let x = self.spike.get(i);
            if i == p || x.abs() <= tol {
                continue;
            }
            self.r_index.push(i);
            self.r_value.push(x);
            max_eta = max_eta.max((x / alpha_p).abs());
            count += 1;
        }
        self.r_pivot.push(p);
        self.r_alpha.push(alpha_p);
        self.r_start.push(self.r_index.len());
        self.r_nz += count;
        self.max_eta = self.max_eta.max(max_eta);
        self.min_pivot = f64::min(self.min_pivot, alpha_p.abs());
        self.max_pivot = f64::max(self.max_pivot, alpha_p.abs());
        self.update_cost_numer += count as f64;
        Ok(())
    }

    /// Replace the basis column at position `pivot_row` by the entering column
    /// whose FTRAN result is `region`, which must have been computed by
    /// [`LU::update_column_ft`].
    ///
    /// `pivot_check` is the pivot computed independently, for example from
    /// the BTRAN'd leaving row. The update is applied if the returned status
    /// is accepted; otherwise nothing changes and the caller should
    /// refactorize.
    pub fn replace_column(
        &mut self,
        region: &IndexedVector,
        pivot_row: usize,
        pivot_check: f64,
        acceptable_pivot: f64,
    ) -> Result<ReplaceStatus, Status> {
        if region.len() != self.m || pivot_row >= self.m {
            return Err(Status::InvalidArgument);
        }
        let ftran_alpha = region.get(pivot_row);
        let ft_alpha = self.check_replace_part1(pivot_row)?;
        let status = self.check_replace_part2(
            pivot_row,
            pivot_check,
            ftran_alpha,
            ft_alpha,
            acceptable_pivot,
        );
        if status.accepted() {
            self.replace_column_part3(pivot_row, ftran_alpha)?;
        } else {
            warn!(
                "column replacement in row {} rejected: {:?} (ftran {:e}, ft {:e}, updates {})",
                pivot_row, status, ftran_alpha, ft_alpha, self.nupdate
            );
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use crate::lu::LU;
    use crate::{FactorConfig, IndexedVector, ReplaceStatus, Status, UpdateMethod};
    use approx::assert_relative_eq;
    use rstest::rstest;

    // [ 2 1 0 ]
    // [ 0 3 1 ]
    // [ 1 0 4 ]
    fn factored(method: UpdateMethod) -> LU {
        let begin = [0, 2, 4];
        let end = [2, 4, 6];
        let index = [0, 2, 0, 1, 1, 2];
        let value = [2.0, 1.0, 1.0, 3.0, 1.0, 4.0];
        let mut lu = LU::new(FactorConfig {
            update_method: method,
            ..Default::default()
        });
        lu.factorize(&begin, &end, &index, &value).unwrap();
        lu
    }

    fn solve(lu: &mut LU, b: &[f64]) -> Vec<f64> {
        let mut x = vec![0.0; b.len()];
        lu.solve_dense(b, &mut x, 'n').unwrap();
        x
    }

    #[rstest]
    #[case(UpdateMethod::ForrestTomlin)]
    #[case(UpdateMethod::ProductForm)]
    fn replacing_a_column_matches_the_new_basis(#[case] method: UpdateMethod) {
        let mut lu = factored(method);
        // replace basis position 1 by (1, 1, 1)
        let mut column = IndexedVector::from_dense(&[1.0, 1.0, 1.0]);
        lu.update_column_ft(&mut column).unwrap();
        let row = 1;
        let alpha = column.get(1);
        let status = lu.replace_column(&column, row, alpha, 1e-8).unwrap();
        assert!(status.accepted());
        assert_eq!(lu.number_pivots(), 1);

        // new basis [ 2 1 0 ; 0 1 1 ; 1 1 4 ] times (1, 2, 3)
        let b = [4.0, 5.0, 15.0];
        let x = solve(&mut lu, &b);
        for (xi, ei) in x.iter().zip([1.0, 2.0, 3.0]) {
            assert_relative_eq!(*xi, ei, epsilon = 1e-12);
        }

        let mut y = vec![0.0; 3];
        lu.solve_dense(&[1.0, 2.0, 3.0], &mut y, 't').unwrap();
        let bt = [[2.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 4.0]];
        for (row, c) in bt.iter().zip([1.0, 2.0, 3.0]) {
            let s: f64 = row.iter().zip(&y).map(|(a, b)| a * b).sum();
            assert_relative_eq!(s, c, epsilon = 1e-12);
        }
    }

    #[test]
    fn forrest_tomlin_keeps_u_files_in_sync() {
        let mut lu = factored(UpdateMethod::ForrestTomlin);
        for (pos, col) in [(0, [0.0, 1.0, 5.0]), (2, [3.0, 0.0, 1.0])] {
            let mut column = IndexedVector::from_dense(&col);
            lu.update_column_ft(&mut column).unwrap();
            let row = pos;
            let status = lu
                .replace_column(&column, row, column.get(pos), 1e-8)
                .unwrap();
            assert!(status.accepted());
            assert_eq!(lu.u_rows.diff(&lu.u_cols, true), 0);
            assert_eq!(lu.u_cols.diff(&lu.u_rows, true), 0);
            assert_eq!(lu.u_cols.live_nz(), lu.u_nz());
        }
        assert_eq!(lu.number_forrest_tomlin(), 2);
    }

    #[test]
    fn replace_without_spike_is_invalid() {
        let mut lu = factored(UpdateMethod::ForrestTomlin);
        assert_eq!(lu.check_replace_part1(0), Err(Status::InvalidCall));
        let column = IndexedVector::new(3);
        assert_eq!(
            lu.replace_column(&column, 0, 1.0, 1e-8),
            Err(Status::InvalidCall)
        );
    }

    #[test]
    fn singular_replacement_is_rejected_without_change() {
        let mut lu = factored(UpdateMethod::ForrestTomlin);
        // column 0 of the basis again in position 1: rank deficient
        let mut column = IndexedVector::from_dense(&[2.0, 0.0, 1.0]);
        lu.update_column_ft(&mut column).unwrap();
        let row = 1;
        let status = lu
            .replace_column(&column, row, column.get(1), 1e-8)
            .unwrap();
        assert_eq!(status, ReplaceStatus::Singular);
        assert_eq!(lu.number_pivots(), 0);

        let x = solve(&mut lu, &[3.0, 4.0, 5.0]);
        for (xi, ei) in x.iter().zip([1.0, 1.0, 1.0]) {
            assert_relative_eq!(*xi, ei, epsilon = 1e-12);
        }
    }

    #[test]
    fn update_limit_is_enforced() {
        let mut lu = LU::new(FactorConfig {
            maximum_pivots: 1,
            ..Default::default()
        });
        lu.factorize(&[0, 1], &[1, 2], &[0, 1], &[1.0, 1.0]).unwrap();
        let mut column = IndexedVector::from_dense(&[2.0, 0.0]);
        lu.update_column_ft(&mut column).unwrap();
        let row = 0;
        assert_eq!(
            lu.replace_column(&column, row, 2.0, 1e-8),
            Ok(ReplaceStatus::Ok)
        );
        let mut column = IndexedVector::from_dense(&[0.0, 3.0]);
        assert_eq!(
            lu.update_column_ft(&mut column),
            Err(Status::UpdateLimitReached)
        );
    }

    #[test]
    fn pivot_disagreement_is_graded() {
        let mut lu = factored(UpdateMethod::ForrestTomlin);
        let mut column = IndexedVector::from_dense(&[1.0, 1.0, 1.0]);
        lu.update_column_ft(&mut column).unwrap();
        let row = 1;
        let alpha = column.get(1);
        let ft = lu.check_replace_part1(row).unwrap();
        assert_eq!(
            lu.check_replace_part2(row, alpha * (1.0 + 1e-3), alpha, ft, 1e-8),
            ReplaceStatus::Singular
        );
        assert_eq!(
            lu.check_replace_part2(row, alpha, alpha, ft, 1e-8),
            ReplaceStatus::Ok
        );
        assert_eq!(
            lu.check_replace_part2(row, alpha, alpha, ft, alpha.abs() * 2.0),
            ReplaceStatus::Singular
        );
    }
}
