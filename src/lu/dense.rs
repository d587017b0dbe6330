// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

use crate::lu::def::dense_ratio;
use crate::lu::lu::resize;
use crate::lu::LU;
use crate::Status;
use log::debug;

/// Decide if the remaining active submatrix is dense enough to finish with
/// dense LU.
pub(crate) fn want_to_go_dense(lu: &LU) -> bool {
    let threshold = lu.config.dense_threshold;
    if threshold == 0 {
        return false;
    }
    let rows_left = lu.m - lu.step_row.len();
    if rows_left <= threshold {
        return false;
    }
    dense_ratio(rows_left) * lu.left_elements as f64 > (rows_left * rows_left) as f64
}

/// Factorize the remaining active submatrix with dense partial pivoting.
///
/// The block is copied column-major, factorized column by column and every
/// step is recorded like a sparse pivot, dropping entries with magnitude at
/// most `zero_tolerance`. Columns without a pivot above `zero_tolerance` are
/// rejected.
pub(crate) fn factor_dense(lu: &mut LU) -> Result<(), Status> {
    let m = lu.m;
    let zero_tolerance = lu.config.zero_tolerance;

    let rows: Vec<usize> = (0..m).filter(|&i| !lu.row_done[i]).collect();
    let cols: Vec<usize> = (0..m).filter(|&j| !lu.col_done[j]).collect();
    let nr = rows.len();
    let nc = cols.len();
    debug!("dense phase: {} rows, {} columns", nr, nc);
    lu.dense_size = nr;

    let mut local = std::mem::take(&mut lu.iwork);
    local.clear();
    local.resize(m, 0);
    for (k, &i) in rows.iter().enumerate() {
        local[i] = k;
    }
    let mut dense = Vec::new();
    resize(&mut dense, nr * nc, 0.0)?;
    for (jj, &j) in cols.iter().enumerate() {
        let (index, values) = lu.a_cols.line(j);
        for (&i, &x) in index.iter().zip(values) {
            dense[jj * nr + local[i]] = x;
        }
    }
    local.clear();
    lu.iwork = local;

    let mut row_used = vec![false; nr];
    for jj in 0..nc {
        let col = cols[jj];
        let column = &dense[jj * nr..(jj + 1) * nr];
        let mut ipiv = None;
        let mut xmax = zero_tolerance;
        for (ii, &x) in column.iter().enumerate() {
            if !row_used[ii] && x.abs() > xmax {
                xmax = x.abs();
                ipiv = Some(ii);
            }
        }
        let Some(ii) = ipiv else {
            debug!("dense phase rejects column {}", col);
            lu.rejected.push(col);
            lu.col_done[col] = true;
            lu.col_count.remove(col);
            continue;
        };
        row_used[ii] = true;
        let piv = dense[jj * nr + ii];

        // L column
        for kk in 0..nr {
            if row_used[kk] {
                continue;
            }
            let l = dense[jj * nr + kk] / piv;
            dense[jj * nr + kk] = l;
            if l.abs() > zero_tolerance {
                lu.l_acc_index.push(rows[kk]);
                lu.l_acc_value.push(l);
            }
        }
        lu.l_acc_begin.push(lu.l_acc_index.len());

        // U row and update of the trailing columns
        for qq in jj + 1..nc {
            let a_rq = dense[qq * nr + ii];
            if a_rq == 0.0 {
                continue;
            }
            if a_rq.abs() > zero_tolerance {
                lu.u_acc_index.push(cols[qq]);
                lu.u_acc_value.push(a_rq);
            }
            for kk in 0..nr {
                if !row_used[kk] {
                    dense[qq * nr + kk] -= dense[jj * nr + kk] * a_rq;
                }
            }
            lu.factor_flops += nr;
        }
        lu.u_acc_begin.push(lu.u_acc_index.len());

        let row = rows[ii];
        lu.step_row.push(row);
        lu.step_col.push(col);
        lu.step_pivot.push(piv);
        lu.row_done[row] = true;
        lu.col_done[col] = true;
        lu.row_count.remove(row);
        lu.col_count.remove(col);
    }

    for &j in &cols {
        lu.a_cols.clear_line(j);
    }
    for &i in &rows {
        lu.a_rows.clear_line(i);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::lu::def::dense_ratio;
    use crate::lu::LU;
    use crate::FactorConfig;

    // Full m x m matrix with a dominant diagonal, column-wise.
    fn full(m: usize) -> (Vec<usize>, Vec<usize>, Vec<usize>, Vec<f64>) {
        let mut begin = Vec::new();
        let mut end = Vec::new();
        let mut index = Vec::new();
        let mut value = Vec::new();
        for j in 0..m {
            begin.push(index.len());
            for i in 0..m {
                index.push(i);
                value.push(if i == j { 2.0 * m as f64 } else { 1.0 / (1 + i + j) as f64 });
            }
            end.push(index.len());
        }
        (begin, end, index, value)
    }

    #[test]
    fn switch_needs_more_rows_than_the_threshold() {
        let m = 6;
        let (begin, end, index, value) = full(m);

        let mut lu = LU::new(FactorConfig {
            dense_threshold: m,
            ..Default::default()
        });
        lu.factorize(&begin, &end, &index, &value).unwrap();
        assert_eq!(lu.dense_size(), 0);

        lu.config.dense_threshold = m - 1;
        lu.factorize(&begin, &end, &index, &value).unwrap();
        assert_eq!(lu.dense_size(), m);
        assert_eq!(lu.rank(), m);
    }

    #[test]
    fn ratio_grows_with_the_block() {
        assert_eq!(dense_ratio(71), 1.5);
        assert_eq!(dense_ratio(800), 2.0);
        assert_eq!(dense_ratio(2000), 3.0);
        assert_eq!(dense_ratio(2001), 4.0);
    }
}
