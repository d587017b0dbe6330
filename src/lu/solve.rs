// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

use crate::lu::dfs::reach;
use crate::lu::file::LineFile;
use crate::lu::statistics::{Kernel, SolveKind};
use crate::lu::workspace::Workspace;
use crate::lu::LU;
use crate::{IndexedVector, Status, UpdateMethod};
use std::time::Instant;

// FTRAN:  B x = b   b by row, x by basis position.  L -> R -> U (-> product form etas)
// BTRAN:  B'y = c   c by basis position, y by row.  (product form etas ->) U' -> R' -> L'
//
// Each triangular stage picks a kernel from the expected size of its result.
// All kernels compute the same values up to the order of summation. Entries
// with magnitude at most `zero_tolerance` are dropped after every stage.

impl LU {
    fn check_solve(&self, rhs: &IndexedVector) -> Result<(), Status> {
        if !self.task.has_factors() {
            return Err(Status::InvalidCall);
        }
        if rhs.len() != self.m {
            return Err(Status::InvalidArgument);
        }
        Ok(())
    }

    /// Overwrite `rhs` with the solution of `B x = rhs`. On entry `rhs` is
    /// indexed by row, on return by basis position. Returns the number of
    /// nonzeros in the result.
    ///
    /// Only `ws` is modified, so threads may solve concurrently with their own
    /// workspaces. Pass the workspace to [`LU::absorb`] afterwards to feed the
    /// counters into the kernel choice.
    pub fn ftran_with(&self, ws: &mut Workspace, rhs: &mut IndexedVector) -> Result<usize, Status> {
        self.check_solve(rhs)?;
        let tic = Instant::now();
        let nz = self.ftran_stages(ws, rhs, SolveKind::Ftran, None);
        ws.stats.time_solve += tic.elapsed().as_secs_f64();
        Ok(nz)
    }

    /// Overwrite `rhs` with the solution of `B'y = rhs`. On entry `rhs` is
    /// indexed by basis position, on return by row.
    pub fn btran_with(&self, ws: &mut Workspace, rhs: &mut IndexedVector) -> Result<usize, Status> {
        self.check_solve(rhs)?;
        let tic = Instant::now();
        let nz = self.btran_stages(ws, rhs);
        ws.stats.time_solve += tic.elapsed().as_secs_f64();
        Ok(nz)
    }

    /// FTRAN with the engine's own workspace.
    pub fn update_column(&mut self, rhs: &mut IndexedVector) -> Result<usize, Status> {
        let mut ws = std::mem::take(&mut self.ws);
        let result = self.ftran_with(&mut ws, rhs);
        self.absorb(&mut ws);
        self.ws = ws;
        result
    }

    /// BTRAN with the engine's own workspace.
    pub fn update_column_transpose(&mut self, rhs: &mut IndexedVector) -> Result<usize, Status> {
        let mut ws = std::mem::take(&mut self.ws);
        let result = self.btran_with(&mut ws, rhs);
        self.absorb(&mut ws);
        self.ws = ws;
        result
    }

    /// FTRAN of an entering column. Saves the partially transformed column
    /// (after `L` and the etas) as spike for the Forrest-Tomlin update, or
    /// the full result for the product form update.
    ///
    /// Fails with [`Status::UpdateLimitReached`] if no further update is
    /// allowed and with [`Status::StorageExhaustion`] if the eta area is
    /// full; refactorize in both cases.
    pub fn update_column_ft(&mut self, rhs: &mut IndexedVector) -> Result<usize, Status> {
        self.check_solve(rhs)?;
        if self.nupdate >= self.config.maximum_pivots {
            return Err(Status::UpdateLimitReached);
        }
        if self.r_index.len() + self.m >= self.r_capacity {
            return Err(Status::StorageExhaustion);
        }
        let tic = Instant::now();
        let mut ws = std::mem::take(&mut self.ws);
        let mut spike = std::mem::take(&mut self.spike);
        let nz = self.ftran_stages(&mut ws, rhs, SolveKind::FtranFt, Some(&mut spike));
        ws.stats.time_solve += tic.elapsed().as_secs_f64();
        self.spike = spike;
        self.spike_ready = true;
        self.eta_row = None;
        self.absorb(&mut ws);
        self.ws = ws;
        Ok(nz)
    }

    /// Solve with a dense right-hand side. `trans` is 't' or 'T' for the
    /// transposed system. `lhs` is overwritten with the solution.
    pub fn solve_dense(&mut self, rhs: &[f64], lhs: &mut [f64], trans: char) -> Result<(), Status> {
        if rhs.len() != self.m || lhs.len() != self.m {
            return Err(Status::InvalidArgument);
        }
        let mut v = IndexedVector::from_dense(rhs);
        if trans == 't' || trans == 'T' {
            self.update_column_transpose(&mut v)?;
        } else {
            self.update_column(&mut v)?;
        }
        lhs.copy_from_slice(v.values());
        Ok(())
    }

    fn ftran_stages(
        &self,
        ws: &mut Workspace,
        rhs: &mut IndexedVector,
        kind: SolveKind,
        mut spike: Option<&mut IndexedVector>,
    ) -> usize {
        let m = self.m;
        let tol = self.config.zero_tolerance;
        let averages = self.averages[kind as usize];
        let forrest_tomlin = self.method == UpdateMethod::ForrestTomlin;
        ws.ensure(m);

        let mut nz = [0; 4];
        nz[0] = rhs.clean(tol);

        let kernel = Kernel::choose(nz[0] as f64 * averages.after_first, m, &self.config);
        ws.stats.l_flops += triangular(
            &self.l_cols,
            None,
            self.l_order.iter().copied(),
            kernel,
            ws,
            rhs,
            m,
        );
        nz[1] = rhs.clean(tol);

        if forrest_tomlin {
            ws.stats.r_flops += self.ftran_row_etas(ws, rhs);
            nz[2] = rhs.clean(tol);
            if let Some(spike) = spike.as_deref_mut() {
                spike.clone_from(rhs);
            }
        } else {
            nz[2] = nz[1];
        }

        let kernel = Kernel::choose(nz[2] as f64 * averages.after_last, m, &self.config);
        ws.stats.u_flops += triangular(
            &self.u_cols,
            Some(&self.pivot_region),
            self.pivot_order.iter_rev(0),
            kernel,
            ws,
            rhs,
            m,
        );
        rhs.clean(tol);
        permute_index(ws, rhs, &self.permute);

        if !forrest_tomlin {
            ws.stats.r_flops += self.ftran_column_etas(ws, rhs);
            rhs.clean(tol);
            if let Some(spike) = spike {
                spike.clone_from(rhs);
            }
        }
        nz[3] = rhs.nnz();
        ws.stats.record(kind, nz);
        nz[3]
    }

    fn btran_stages(&self, ws: &mut Workspace, rhs: &mut IndexedVector) -> usize {
        let m = self.m;
        let tol = self.config.zero_tolerance;
        let averages = self.averages[SolveKind::Btran as usize];
        let forrest_tomlin = self.method == UpdateMethod::ForrestTomlin;
        ws.ensure(m);

        let mut nz = [0; 4];
        nz[0] = rhs.clean(tol);
        if !forrest_tomlin {
            ws.stats.r_flops += self.btran_column_etas(ws, rhs);
            rhs.clean(tol);
        }
        permute_index(ws, rhs, &self.permute_back);

        let kernel = Kernel::choose(rhs.nnz() as f64 * averages.after_first, m, &self.config);
        ws.stats.u_flops += triangular(
            &self.u_rows,
            Some(&self.pivot_region),
            self.pivot_order.iter(0),
            kernel,
            ws,
            rhs,
            m,
        );
        nz[1] = rhs.clean(tol);

        if forrest_tomlin {
            ws.stats.r_flops += self.btran_row_etas(ws, rhs);
            nz[2] = rhs.clean(tol);
        } else {
            nz[2] = nz[1];
        }

        let kernel = Kernel::choose(nz[2] as f64 * averages.after_last, m, &self.config);
        ws.stats.l_flops += triangular(
            &self.l_rows,
            None,
            self.l_order.iter().rev().copied(),
            kernel,
            ws,
            rhs,
            m,
        );
        nz[3] = rhs.clean(tol);
        ws.stats.record(SolveKind::Btran, nz);
        nz[3]
    }

    // v[r_p] -= sum eta[r'] v[r'] for each row eta in creation order.
    fn ftran_row_etas(&self, ws: &mut Workspace, rhs: &mut IndexedVector) -> usize {
        let (values, index) = rhs.parts_mut();
        let marker = mark_pattern(ws, index);
        let mut flops = 0;
        for (k, &rp) in self.r_pivot.iter().enumerate() {
            let range = self.r_start[k]..self.r_start[k + 1];
            let mut s = 0.0;
            for pos in range.clone() {
                s += self.r_value[pos] * values[self.r_index[pos]];
            }
            flops += range.len();
            if s != 0.0 {
                values[rp] -= s;
                if ws.marked[rp] != marker {
                    ws.marked[rp] = marker;
                    index.push(rp);
                }
            }
        }
        flops
    }

    // Transposed row etas in reverse order.
    fn btran_row_etas(&self, ws: &mut Workspace, rhs: &mut IndexedVector) -> usize {
        let (values, index) = rhs.parts_mut();
        let marker = mark_pattern(ws, index);
        let mut flops = 0;
        for (k, &rp) in self.r_pivot.iter().enumerate().rev() {
            let x = values[rp];
            if x == 0.0 {
                continue;
            }
            for pos in self.r_start[k]..self.r_start[k + 1] {
                let i = self.r_index[pos];
                values[i] -= self.r_value[pos] * x;
                if ws.marked[i] != marker {
                    ws.marked[i] = marker;
                    index.push(i);
                }
                flops += 1;
            }
        }
        flops
    }

    // x_p /= alpha_p; x_i -= alpha_i x_p for each column eta in creation order.
    fn ftran_column_etas(&self, ws: &mut Workspace, rhs: &mut IndexedVector) -> usize {
        let (values, index) = rhs.parts_mut();
        let marker = mark_pattern(ws, index);
        let mut flops = 0;
        for (k, &p) in self.r_pivot.iter().enumerate() {
            let x = values[p];
            if x == 0.0 {
                continue;
            }
            let x = x / self.r_alpha[k];
            values[p] = x;
            for pos in self.r_start[k]..self.r_start[k + 1] {
                let i = self.r_index[pos];
                values[i] -= self.r_value[pos] * x;
                if ws.marked[i] != marker {
                    ws.marked[i] = marker;
                    index.push(i);
                }
                flops += 1;
            }
        }
        flops
    }

    // c_p = (c_p - sum alpha_i c_i) / alpha_p for each column eta in reverse order.
    fn btran_column_etas(&self, ws: &mut Workspace, rhs: &mut IndexedVector) -> usize {
        let (values, index) = rhs.parts_mut();
        let marker = mark_pattern(ws, index);
        let mut flops = 0;
        for (k, &p) in self.r_pivot.iter().enumerate().rev() {
            let range = self.r_start[k]..self.r_start[k + 1];
            let mut s = values[p];
            for pos in range.clone() {
                s -= self.r_value[pos] * values[self.r_index[pos]];
            }
            flops += range.len();
            let x = s / self.r_alpha[k];
            if x != 0.0 || values[p] != 0.0 {
                values[p] = x;
                if ws.marked[p] != marker {
                    ws.marked[p] = marker;
                    index.push(p);
                }
            }
        }
        flops
    }
}

/// Mark the entries of `index` with a fresh stamp and return it.
fn mark_pattern(ws: &mut Workspace, index: &[usize]) -> u32 {
    let marker = ws.next_marker();
    for &i in index {
        ws.marked[i] = marker;
    }
    marker
}

/// Move entry `i` of `rhs` to position `map[i]`.
fn permute_index(ws: &mut Workspace, rhs: &mut IndexedVector, map: &[usize]) {
    let (values, index) = rhs.parts_mut();
    for &i in index.iter() {
        ws.work[map[i]] = values[i];
        values[i] = 0.0;
    }
    for i in index.iter_mut() {
        *i = map[*i];
        values[*i] = ws.work[*i];
        ws.work[*i] = 0.0;
    }
}

/// Solve with a triangular factor stored as lines. Processing node `r` takes
/// `x = v[r]` (times `pivots[r]` if given, storing the result in `v[r]`) and
/// subtracts `x` times line `r` from `v`. `order` must list every node after
/// all nodes whose lines point to it. Returns the number of flops.
fn triangular<I: Iterator<Item = usize>>(
    graph: &LineFile,
    pivots: Option<&[f64]>,
    order: I,
    kernel: Kernel,
    ws: &mut Workspace,
    rhs: &mut IndexedVector,
    m: usize,
) -> usize {
    let (values, index) = rhs.parts_mut();
    let mut flops = 0;
    let mut eliminate = |r: usize, values: &mut [f64]| -> bool {
        let mut x = values[r];
        if x == 0.0 {
            return false;
        }
        if let Some(pivots) = pivots {
            x *= pivots[r];
            values[r] = x;
        }
        let (rows, coefs) = graph.line(r);
        for (&i, &a) in rows.iter().zip(coefs) {
            values[i] -= a * x;
        }
        flops += rows.len();
        true
    };

    match kernel {
        Kernel::Sparse => {
            let marker = ws.next_marker();
            let top = reach(
                graph,
                index,
                &mut ws.xi[..m],
                &mut ws.pstack[..m],
                &mut ws.marked[..m],
                marker,
            );
            index.clear();
            for &r in &ws.xi[top..m] {
                if eliminate(r, values) {
                    index.push(r);
                }
            }
        }
        Kernel::Densish => {
            index.clear();
            for r in order {
                if eliminate(r, values) {
                    index.push(r);
                }
            }
        }
        Kernel::Dense => {
            for r in order {
                eliminate(r, values);
            }
            index.clear();
            index.extend((0..m).filter(|&i| values[i] != 0.0));
        }
    }
    flops
}
