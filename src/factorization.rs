// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

use crate::lu::LU;
use crate::{ColumnMatrix, FactorConfig, IndexedVector, ReplaceStatus, Status, Workspace};
use log::debug;

/// Factorization of a simplex basis drawn from a constraint matrix.
///
/// A basis is a list of sequence numbers, one per row. Sequence `j <
/// ncols` is column `j` of the constraint matrix; `ncols + i` is the slack
/// of row `i` (a unit column).
///
/// FTRAN results are indexed by basis position, BTRAN results by row. The
/// engine is exposed as `lu` for statistics and the lower level calls.
#[derive(Debug, Clone, Default)]
pub struct BasisFactorization {
    pub lu: LU,

    ncols: usize,
    b_begin: Vec<usize>,
    b_end: Vec<usize>,
    b_index: Vec<usize>,
    b_value: Vec<f64>,
}

impl BasisFactorization {
    pub fn new(config: FactorConfig) -> Self {
        Self {
            lu: LU::new(config),
            ..Default::default()
        }
    }

    /// Factorize the basis matrix whose column `k` is the variable
    /// `basis[k]` of `matrix`.
    ///
    /// On a singular basis the factors are still valid with the rejected
    /// positions replaced by slacks; call [`BasisFactorization::make_non_singular`]
    /// to apply the same substitution to the basis.
    pub fn factor(&mut self, matrix: &ColumnMatrix, basis: &[usize]) -> Result<(), Status> {
        let m = matrix.nrows();
        let ncols = matrix.ncols();
        if basis.len() != m {
            return Err(Status::InvalidArgument);
        }
        self.ncols = ncols;

        self.b_begin.clear();
        self.b_end.clear();
        self.b_index.clear();
        self.b_value.clear();
        for &seq in basis {
            self.b_begin.push(self.b_index.len());
            if seq < ncols {
                let (index, value) = matrix.column(seq);
                self.b_index.extend_from_slice(index);
                self.b_value.extend_from_slice(value);
            } else if seq < ncols + m {
                self.b_index.push(seq - ncols);
                self.b_value.push(1.0);
            } else {
                return Err(Status::InvalidArgument);
            }
            self.b_end.push(self.b_index.len());
        }
        debug!("factor basis of {} rows, {} entries", m, self.b_index.len());
        self.lu
            .factorize(&self.b_begin, &self.b_end, &self.b_index, &self.b_value)
    }

    /// Replace the basis positions rejected by the last factorization by the
    /// slacks that took their place. Returns the number of substitutions.
    pub fn make_non_singular(&self, sequence: &mut [usize]) -> usize {
        let pairs = self.lu.singular_pairs();
        for &(position, row) in pairs {
            sequence[position] = self.ncols + row;
        }
        pairs.len()
    }

    /// Variable pivoted in each row: `pivot_variable[r] = sequence[permute[r]]`.
    pub fn post_process(&self, sequence: &[usize], pivot_variable: &mut [usize]) -> Result<(), Status> {
        if !self.lu.is_factored() {
            return Err(Status::InvalidCall);
        }
        let m = self.lu.m();
        if sequence.len() != m || pivot_variable.len() != m {
            return Err(Status::InvalidArgument);
        }
        for (r, &k) in self.lu.permute().iter().enumerate() {
            pivot_variable[r] = sequence[k];
        }
        Ok(())
    }

    /// FTRAN: `B x = rhs`.
    pub fn update_column(&mut self, rhs: &mut IndexedVector) -> Result<usize, Status> {
        self.lu.update_column(rhs)
    }

    /// FTRAN of an entering column, keeping what the next
    /// [`BasisFactorization::replace_column`] needs.
    pub fn update_column_ft(&mut self, rhs: &mut IndexedVector) -> Result<usize, Status> {
        self.lu.update_column_ft(rhs)
    }

    /// BTRAN: `B'y = rhs`.
    pub fn update_column_transpose(&mut self, rhs: &mut IndexedVector) -> Result<usize, Status> {
        self.lu.update_column_transpose(rhs)
    }

    /// FTRAN through a caller-owned workspace. See [`LU::ftran_with`].
    pub fn ftran_with(&self, ws: &mut Workspace, rhs: &mut IndexedVector) -> Result<usize, Status> {
        self.lu.ftran_with(ws, rhs)
    }

    /// BTRAN through a caller-owned workspace. See [`LU::btran_with`].
    pub fn btran_with(&self, ws: &mut Workspace, rhs: &mut IndexedVector) -> Result<usize, Status> {
        self.lu.btran_with(ws, rhs)
    }

    /// Replace basis position `pivot_row` by the entering column. See
    /// [`LU::replace_column`].
    pub fn replace_column(
        &mut self,
        region: &IndexedVector,
        pivot_row: usize,
        pivot_check: f64,
        acceptable_pivot: f64,
    ) -> Result<ReplaceStatus, Status> {
        self.lu
            .replace_column(region, pivot_row, pivot_check, acceptable_pivot)
    }

    /// True when the update limit is reached or updates have cost more than
    /// a fresh factorization.
    pub fn wants_refactorization(&self) -> bool {
        self.lu.number_pivots() >= self.lu.config.maximum_pivots || self.lu.update_cost() > 1.0
    }

    pub fn number_rows(&self) -> usize {
        self.lu.m()
    }

    pub fn number_pivots(&self) -> usize {
        self.lu.number_pivots()
    }

    pub fn number_elements(&self) -> usize {
        self.lu.number_elements()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // [ 1 0 2 ]
    // [ 0 0 3 ]
    // [ 4 0 0 ]
    fn matrix() -> ColumnMatrix {
        ColumnMatrix::from_triplets(3, 3, &[(0, 0, 1.0), (2, 0, 4.0), (0, 2, 2.0), (1, 2, 3.0)])
            .unwrap()
    }

    #[test]
    fn slacks_complete_the_basis() {
        let mut bf = BasisFactorization::new(FactorConfig::default());
        // column 0, slack of row 1, column 2
        bf.factor(&matrix(), &[0, 4, 2]).unwrap();
        let mut x = IndexedVector::from_dense(&[3.0, 4.0, 4.0]);
        bf.update_column(&mut x).unwrap();
        // B = [1 0 2; 0 1 3; 4 0 0], B (1, 1, 1) = (3, 4, 4)
        for k in 0..3 {
            assert_relative_eq!(x.get(k), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn empty_column_is_replaced_by_a_slack() {
        let mut bf = BasisFactorization::new(FactorConfig::default());
        let mut basis = [0, 1, 2];
        let status = bf.factor(&matrix(), &basis);
        assert_eq!(status, Err(Status::StructuralSingularity));
        assert_eq!(bf.make_non_singular(&mut basis), 1);
        // the leftover row supplies the slack
        assert_eq!(basis[1], 3 + bf.lu.singular_pairs()[0].1);
        assert!(bf.factor(&matrix(), &basis).is_ok());
    }

    #[test]
    fn post_process_maps_rows_to_variables() {
        let mut bf = BasisFactorization::new(FactorConfig::default());
        let basis = [0, 4, 2];
        bf.factor(&matrix(), &basis).unwrap();
        let mut pivot_variable = [0; 3];
        bf.post_process(&basis, &mut pivot_variable).unwrap();
        for (r, &var) in pivot_variable.iter().enumerate() {
            let k = bf.lu.permute()[r];
            assert_eq!(basis[k], var);
            assert_eq!(bf.lu.permute_back()[k], r);
        }
    }

    #[test]
    fn out_of_range_sequence_is_rejected() {
        let mut bf = BasisFactorization::new(FactorConfig::default());
        assert_eq!(
            bf.factor(&matrix(), &[0, 1, 6]),
            Err(Status::InvalidArgument)
        );
        assert_eq!(bf.factor(&matrix(), &[0, 1]), Err(Status::InvalidArgument));
    }
}
