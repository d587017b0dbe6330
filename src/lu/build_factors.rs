// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

use crate::lu::file::LineFile;
use crate::lu::lu::{reserve, resize};
use crate::lu::LU;
use crate::Status;

/// Turn the elimination record into the factors used for solves and updates.
///
/// ```txt
///     permute[r]       basis position pivoted in row r
///     pivot_region[r]  1 / pivot of row r
///     l_cols[r]        L column of the step that pivoted row r
///     l_rows[i]        L row i, pointing to the pivot rows of earlier steps
///     u_rows[r]        U row r, indexed by the pivot rows of later steps
///     u_cols[r]        U column of the step that pivoted row r
/// ```
///
/// U entries in columns that were replaced by slacks are dropped. The U files
/// get `area_factor` times their size plus room for one line per row, which
/// bounds the fill that updates may add before a refactorization is needed.
pub(crate) fn build_factors(lu: &mut LU) -> Result<(), Status> {
    let m = lu.m;
    let nsteps = lu.step_row.len();
    debug_assert_eq!(nsteps, m);

    let mut is_rejected = Vec::new();
    resize(&mut is_rejected, m, false)?;
    for &col in &lu.rejected {
        is_rejected[col] = true;
    }

    lu.min_pivot = f64::INFINITY;
    lu.max_pivot = 0.0;
    for k in 0..nsteps {
        let (row, col, piv) = (lu.step_row[k], lu.step_col[k], lu.step_pivot[k]);
        lu.permute[row] = col;
        lu.permute_back[col] = row;
        lu.pivot_region[row] = 1.0 / piv;
        lu.min_pivot = f64::min(lu.min_pivot, piv.abs());
        lu.max_pivot = f64::max(lu.max_pivot, piv.abs());
    }
    if nsteps == 0 {
        lu.min_pivot = 0.0;
    }

    // L by columns in step order, then by rows.
    lu.l_nz = lu.l_acc_index.len();
    let mut row_nz = Vec::new();
    resize(&mut row_nz, m, 0)?;
    lu.l_cols = LineFile::new(m, 0, 0, 0.0);
    lu.l_cols.grow(lu.l_nz)?;
    for k in 0..nsteps {
        let row = lu.step_row[k];
        let range = lu.l_acc_begin[k]..lu.l_acc_begin[k + 1];
        if !lu.l_cols.get_space(row, range.len()) {
            return Err(Status::StorageExhaustion);
        }
        for pos in range {
            let i = lu.l_acc_index[pos];
            lu.l_cols.push(row, i, lu.l_acc_value[pos]);
            row_nz[i] += 1;
        }
    }
    lu.l_rows = transpose_lines(&lu.l_cols, &lu.step_row, &row_nz, lu.l_nz, 0, 0.0)?;
    reserve(&mut lu.l_order, m)?;
    lu.l_order.extend_from_slice(&lu.step_row);

    // U rows in step order, indexed by pivot rows.
    let u_entries = lu.u_acc_index.len();
    let pad = lu.config.pad;
    let capacity = usize::max((lu.config.area_factor * u_entries as f64) as usize, u_entries)
        + (pad + 2) * m
        + 1;
    row_nz.fill(0);
    lu.u_rows = LineFile::new(m, 0, pad, 0.0);
    lu.u_rows.grow(capacity)?;
    for k in 0..nsteps {
        let row = lu.step_row[k];
        let range = lu.u_acc_begin[k]..lu.u_acc_begin[k + 1];
        if !lu.u_rows.get_space(row, range.len()) {
            return Err(Status::StorageExhaustion);
        }
        for pos in range {
            let col = lu.u_acc_index[pos];
            if is_rejected[col] {
                continue;
            }
            let j = lu.permute_back[col];
            lu.u_rows.push(row, j, lu.u_acc_value[pos]);
            row_nz[j] += 1;
        }
    }
    lu.u_nz = lu.u_rows.live_nz();
    lu.u_cols = transpose_lines(&lu.u_rows, &lu.step_row, &row_nz, capacity, pad, 0.0)?;

    lu.pivot_order.init(m, 1);
    for &row in &lu.step_row {
        lu.pivot_order.add(row, 0);
    }

    // update etas: one slot of at most m entries per update
    let r_capacity = usize::max(
        (lu.config.area_factor * (lu.l_nz + lu.u_nz) as f64) as usize,
        4 * m,
    ) + m;
    lu.r_capacity = r_capacity;
    reserve(&mut lu.r_index, r_capacity)?;
    reserve(&mut lu.r_value, r_capacity)?;
    reserve(&mut lu.r_start, lu.config.maximum_pivots + 1)?;
    reserve(&mut lu.r_pivot, lu.config.maximum_pivots)?;
    reserve(&mut lu.r_alpha, lu.config.maximum_pivots)?;
    lu.r_start.push(0);
    lu.r_nz = 0;

    #[cfg(feature = "debug")]
    {
        assert_eq!(lu.l_cols.diff(&lu.l_rows, true), 0);
        assert_eq!(lu.u_rows.diff(&lu.u_cols, true), 0);
    }
    Ok(())
}

/// Transpose of `file` with `counts[i]` entries in line `i`. Lines are laid
/// out in `order`.
fn transpose_lines(
    file: &LineFile,
    order: &[usize],
    counts: &[usize],
    capacity: usize,
    pad: usize,
    stretch: f64,
) -> Result<LineFile, Status> {
    let mut t = LineFile::new(counts.len(), 0, pad, stretch);
    t.grow(capacity)?;
    for &line in order {
        if !t.get_space(line, counts[line]) {
            return Err(Status::StorageExhaustion);
        }
    }
    for &line in order {
        let (index, value) = file.line(line);
        for (&i, &x) in index.iter().zip(value) {
            t.push(i, line, x);
        }
    }
    Ok(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transpose_matches_original() {
        let mut file = LineFile::new(3, 8, 0, 0.0);
        let order = [2, 0, 1];
        let entries: [&[(usize, f64)]; 3] = [&[(1, 1.0)], &[], &[(0, 2.0), (1, 3.0)]];
        let mut counts = [0; 3];
        for &line in &order {
            assert!(file.get_space(line, entries[line].len()));
            for &(i, x) in entries[line] {
                file.push(line, i, x);
                counts[i] += 1;
            }
        }
        let t = transpose_lines(&file, &order, &counts, 8, 0, 0.0).unwrap();
        assert_eq!(t.diff(&file, true), 0);
        assert_eq!(file.diff(&t, true), 0);
        assert_eq!(t.line(1), (&[2, 0][..], &[3.0, 1.0][..]));
    }
}
