// Copyright (C) 2016-2019 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

use crate::lu::LU;
use std::time::Instant;

/// Result of a pivot search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Candidate {
    Pivot { row: usize, col: usize },
    /// An active column without entries. It cannot be pivoted.
    EmptyColumn(usize),
    /// No active column left.
    Exhausted,
}

// Search for pivot element with small Markowitz cost. An eligible pivot
// must satisfy
//
// 1. `abs(piv) >= zero_tolerance`,
// 2. `abs(piv) >= pivot_tolerance * max[pivot column]`.
//
// From all eligible pivots search for one that minimizes
//
//     mc := (nnz[pivot row] - 1) * (nnz[pivot column] - 1).
//
// Lines are visited by increasing count, at each count the columns before
// the rows. Among equal costs the larger magnitude wins, remaining ties keep
// the candidate found first. The search is terminated when `search_limit`
// rows or columns with eligible pivots have been searched, or as soon as a
// cost is found that no line of higher count can beat.
//
// Empty active columns are returned immediately.
//
// The Markowitz search is implemented as described in [1].
//
// [1] U. Suhl, L. Suhl, "Computing Sparse LU Factorizations for Large-Scale
//     Linear Programming Bases", ORSA Journal on Computing (1990)
pub(crate) fn markowitz(lu: &mut LU) -> Candidate {
    let tic = Instant::now();
    let m = lu.m;

    if let Some(j) = lu.col_count.first(0) {
        debug_assert_eq!(lu.a_cols.len(j), 0);
        return Candidate::EmptyColumn(j);
    }

    let zero_tolerance = lu.config.zero_tolerance;
    let pivot_tolerance = lu.config.pivot_tolerance;
    let search_limit = lu.config.search_limit;
    let nz_start = usize::min(lu.col_count.min_list, lu.row_count.min_list);

    // integers for Markowitz cost must be 64 bit to prevent overflow
    let mut best: Option<(usize, usize, f64)> = None;
    let mut mc_best = u64::MAX;
    let mut nsearch = 0;
    let mut min_colnz: Option<usize> = None;
    let mut min_rownz: Option<usize> = None;

    let better = |mc: u64, x: f64, mc_best: u64, best: &Option<(usize, usize, f64)>| match best {
        None => true,
        Some((_, _, xbest)) => mc < mc_best || (mc == mc_best && x > *xbest),
    };

    'search: for nz in nz_start..=m {
        // Search columns with nz nonzeros.
        let mut next = lu.col_count.first(nz);
        while let Some(j) = next {
            next = lu.col_count.next(j);
            min_colnz.get_or_insert(nz);
            debug_assert_eq!(lu.a_cols.len(j), nz);
            let cmx = lu.col_max[j];
            let tol = f64::max(zero_tolerance, pivot_tolerance * cmx);
            let mut found = false;
            let (rows, values) = lu.a_cols.line(j);
            for (&i, &v) in rows.iter().zip(values) {
                let x = v.abs();
                if x < tol {
                    continue;
                }
                found = true;
                let mc = (nz as u64 - 1) * (lu.a_rows.len(i) as u64 - 1);
                if better(mc, x, mc_best, &best) {
                    mc_best = mc;
                    best = Some((i, j, x));
                }
            }
            if found {
                nsearch += 1;
                if mc_best <= (nz as u64 - 1) * (nz as u64 - 1) || nsearch >= search_limit {
                    break 'search;
                }
            }
        }

        // Search rows with nz nonzeros.
        let mut next = lu.row_count.first(nz);
        while let Some(i) = next {
            // row i may be parked below, so keep the successor
            next = lu.row_count.next(i);
            min_rownz.get_or_insert(nz);
            debug_assert_eq!(lu.a_rows.len(i), nz);
            let mut cheap = false; // row has entries with Markowitz cost <= best?
            let mut found = false; // eligible pivot found?
            for &j in lu.a_rows.indices(i) {
                let mc = (nz as u64 - 1) * (lu.a_cols.len(j) as u64 - 1);
                if mc > mc_best {
                    continue;
                }
                cheap = true;
                let cmx = lu.col_max[j];
                let Some(pos) = lu.a_cols.find(j, i) else {
                    continue;
                };
                let x = lu.a_cols.value[pos].abs();
                if x >= zero_tolerance && x >= pivot_tolerance * cmx {
                    found = true;
                    if better(mc, x, mc_best, &best) {
                        mc_best = mc;
                        best = Some((i, j, x));
                    }
                }
            }
            // If row i has cheap entries but none of them is numerically
            // acceptable, then don't search the row again until updated.
            if cheap && !found {
                lu.row_count.move_to(i, m + 1);
            } else if found {
                nsearch += 1;
                if mc_best <= nz as u64 * (nz as u64 - 1) || nsearch >= search_limit {
                    break 'search;
                }
            }
        }
    }

    lu.nsearch_pivot += nsearch;
    if let Some(nz) = min_colnz {
        lu.col_count.min_list = nz;
    }
    if let Some(nz) = min_rownz {
        lu.row_count.min_list = nz;
    }
    lu.time_search_pivot += tic.elapsed().as_secs_f64();

    match best {
        Some((row, col, _)) => Candidate::Pivot { row, col },
        None => Candidate::Exhausted,
    }
}
