// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

#![allow(dead_code)]

use basis_lu::ColumnMatrix;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Dense column of length `m` with a dominant entry in row `diag` and up to
/// `offdiag` entries in [-1, 1) elsewhere.
pub fn dominant_column(rng: &mut StdRng, m: usize, diag: usize, offdiag: usize) -> Vec<f64> {
    let mut col = vec![0.0; m];
    for _ in 0..offdiag {
        let i = rng.gen_range(0..m);
        if i != diag {
            col[i] = rng.gen_range(-1.0..1.0);
        }
    }
    col[diag] = (offdiag as f64 + 2.0) * if rng.gen_bool(0.5) { -1.0 } else { 1.0 };
    col
}

/// Basis columns by position, together with the basis as a constraint
/// matrix whose column `k` is position `k`.
pub struct DenseBasis {
    pub m: usize,
    pub columns: Vec<Vec<f64>>,
}

impl DenseBasis {
    /// Column-diagonally dominant basis with the dominant rows shuffled.
    pub fn random(rng: &mut StdRng, m: usize, offdiag: usize) -> Self {
        let mut rows: Vec<usize> = (0..m).collect();
        rows.shuffle(rng);
        let columns = rows
            .iter()
            .map(|&r| dominant_column(rng, m, r, offdiag))
            .collect();
        DenseBasis { m, columns }
    }

    pub fn matrix(&self) -> ColumnMatrix {
        let mut triplets = Vec::new();
        for (k, col) in self.columns.iter().enumerate() {
            for (i, &x) in col.iter().enumerate() {
                if x != 0.0 {
                    triplets.push((i, k, x));
                }
            }
        }
        ColumnMatrix::from_triplets(self.m, self.m, &triplets).unwrap()
    }

    /// Identity basis over `matrix()`.
    pub fn sequence(&self) -> Vec<usize> {
        (0..self.m).collect()
    }

    /// `B x`, indexed by row.
    pub fn times(&self, x: &[f64]) -> Vec<f64> {
        let mut b = vec![0.0; self.m];
        for (col, &xk) in self.columns.iter().zip(x) {
            for (bi, &a) in b.iter_mut().zip(col) {
                *bi += a * xk;
            }
        }
        b
    }

    /// `B'y`, indexed by basis position.
    pub fn transpose_times(&self, y: &[f64]) -> Vec<f64> {
        self.columns
            .iter()
            .map(|col| col.iter().zip(y).map(|(a, b)| a * b).sum())
            .collect()
    }
}

/// Uniform entries in [-1, 1).
pub fn random_vector(rng: &mut StdRng, m: usize) -> Vec<f64> {
    (0..m).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

pub fn max_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}
