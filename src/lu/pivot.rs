// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

use crate::lu::LU;
use crate::Status;
use std::time::Instant;

/// Eliminate pivot `(row, col)` from the active submatrix.
///
/// The pivot column scaled by the pivot becomes column `row` of `L`, the
/// pivot row becomes row `row` of `U`. Every column in the pivot row gets a
/// rank-1 update; fill-in is appended through `get_space_iterate`. Entries
/// dropping to `zero_tolerance` or below are removed, and a column whose
/// maximum falls that low is emptied so the search rejects it.
pub(crate) fn pivot(lu: &mut LU, row: usize, col: usize) -> Result<(), Status> {
    let tic = Instant::now();
    let zero_tolerance = lu.config.zero_tolerance;

    let Some(pos) = lu.a_cols.find(col, row) else {
        return Err(Status::InvalidCall);
    };
    let piv = lu.a_cols.value[pos];

    // L column: rows of the pivot column, scaled.
    lu.reserve_markers(lu.a_rows.len(row) + 1);
    let lmark = lu.next_marker();
    let lbeg = lu.l_acc_index.len();
    {
        let (rows, values) = lu.a_cols.line(col);
        for (&i, &x) in rows.iter().zip(values) {
            if i == row {
                continue;
            }
            let l = x / piv;
            lu.l_acc_index.push(i);
            lu.l_acc_value.push(l);
            lu.work[i] = l;
            lu.marked[i] = lmark;
        }
    }
    let lend = lu.l_acc_index.len();
    lu.l_acc_begin.push(lend);

    // U row: columns of the pivot row. Keep a copy of the pattern since the
    // row file may be compressed below.
    let mut pattern = std::mem::take(&mut lu.iwork);
    pattern.clear();
    pattern.extend(lu.a_rows.indices(row).iter().copied().filter(|&j| j != col));

    for &j in &pattern {
        let Some(a_rj) = lu.a_cols.remove(j, row) else {
            lu.iwork = pattern;
            return Err(Status::InvalidCall);
        };
        lu.left_elements -= 1;
        lu.u_acc_index.push(j);
        lu.u_acc_value.push(a_rj);

        // update entries present in column j
        let jmark = lu.next_marker();
        let mut cmx: f64 = 0.0;
        let mut pos = lu.a_cols.begin[j];
        while pos < lu.a_cols.end[j] {
            let i = lu.a_cols.index[pos];
            if lu.marked[i] == lmark {
                lu.touched[i] = jmark;
                let x = lu.a_cols.value[pos] - lu.work[i] * a_rj;
                if x.abs() <= zero_tolerance {
                    lu.a_cols.remove_at(j, pos);
                    lu.a_rows.remove(i, j);
                    lu.left_elements -= 1;
                    continue;
                }
                lu.a_cols.value[pos] = x;
            }
            cmx = f64::max(cmx, lu.a_cols.value[pos].abs());
            pos += 1;
        }

        // fill-in
        let nfill = (lbeg..lend)
            .filter(|&k| lu.touched[lu.l_acc_index[k]] != jmark)
            .count();
        if nfill > 0 {
            lu.get_column_space_iterate(j, nfill)?;
            for k in lbeg..lend {
                let i = lu.l_acc_index[k];
                if lu.touched[i] == jmark {
                    continue;
                }
                let x = -lu.l_acc_value[k] * a_rj;
                if x.abs() <= zero_tolerance {
                    continue;
                }
                lu.a_cols.push(j, i, x);
                lu.left_elements += 1;
                lu.get_row_space_iterate(i, 1)?;
                lu.a_rows.push(i, j, 0.0);
                cmx = f64::max(cmx, x.abs());
            }
        }
        lu.factor_flops += lend - lbeg;

        lu.col_max[j] = cmx;
        if cmx <= zero_tolerance {
            clear_column(lu, j);
        }
        lu.col_count.move_to(j, lu.a_cols.len(j));
    }
    pattern.clear();
    lu.iwork = pattern;

    // Remove the pivot column from the row patterns and rebucket the rows.
    for k in lbeg..lend {
        let i = lu.l_acc_index[k];
        lu.a_rows.remove(i, col);
        lu.work[i] = 0.0;
        let nz = lu.a_rows.len(i);
        lu.row_count.move_to(i, nz);
    }

    lu.u_acc_begin.push(lu.u_acc_index.len());
    lu.step_row.push(row);
    lu.step_col.push(col);
    lu.step_pivot.push(piv);

    lu.left_elements -= lu.a_cols.len(col);
    lu.a_cols.clear_line(col);
    lu.a_rows.clear_line(row);
    lu.col_count.remove(col);
    lu.row_count.remove(row);
    lu.col_done[col] = true;
    lu.row_done[row] = true;

    lu.time_elim_pivot += tic.elapsed().as_secs_f64();
    Ok(())
}

/// Drop all entries of active column `j`.
pub(crate) fn clear_column(lu: &mut LU, j: usize) {
    for pos in lu.a_cols.begin[j]..lu.a_cols.end[j] {
        let i = lu.a_cols.index[pos];
        lu.a_rows.remove(i, j);
        let nz = lu.a_rows.len(i);
        lu.row_count.move_to(i, nz);
    }
    lu.left_elements -= lu.a_cols.len(j);
    lu.a_cols.clear_line(j);
    lu.col_max[j] = 0.0;
}
