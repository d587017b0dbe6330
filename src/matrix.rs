// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

use crate::Status;

/// Constraint matrix in compressed column form.
///
/// Column `j` holds `row_index[start[j]..start[j+1]]` and the matching
/// `value` slice. Row indices within a column are unique.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMatrix {
    nrows: usize,
    ncols: usize,
    start: Vec<usize>,
    row_index: Vec<usize>,
    value: Vec<f64>,
}

impl ColumnMatrix {
    /// Wrap compressed column arrays. Fails with [`Status::InvalidArgument`]
    /// if the pointers are not monotone, a row is out of range or a column
    /// repeats a row.
    pub fn new(
        nrows: usize,
        ncols: usize,
        start: Vec<usize>,
        row_index: Vec<usize>,
        value: Vec<f64>,
    ) -> Result<Self, Status> {
        if start.len() != ncols + 1 || start[0] != 0 || row_index.len() != value.len() {
            return Err(Status::InvalidArgument);
        }
        if start[ncols] != row_index.len() {
            return Err(Status::InvalidArgument);
        }
        let mut seen = vec![usize::MAX; nrows];
        for j in 0..ncols {
            if start[j] > start[j + 1] {
                return Err(Status::InvalidArgument);
            }
            for &i in &row_index[start[j]..start[j + 1]] {
                if i >= nrows || seen[i] == j {
                    return Err(Status::InvalidArgument);
                }
                seen[i] = j;
            }
        }
        Ok(Self {
            nrows,
            ncols,
            start,
            row_index,
            value,
        })
    }

    /// Build from `(row, column, value)` triplets. Duplicates are summed.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: &[(usize, usize, f64)],
    ) -> Result<Self, Status> {
        let mut count = vec![0; ncols + 1];
        for &(i, j, _) in triplets {
            if i >= nrows || j >= ncols {
                return Err(Status::InvalidArgument);
            }
            count[j + 1] += 1;
        }
        for j in 0..ncols {
            count[j + 1] += count[j];
        }
        let mut put = count.clone();
        let mut row_index = vec![0; triplets.len()];
        let mut value = vec![0.0; triplets.len()];
        for &(i, j, x) in triplets {
            row_index[put[j]] = i;
            value[put[j]] = x;
            put[j] += 1;
        }

        // sum duplicates in place, column by column
        let mut start = vec![0; ncols + 1];
        let mut where_ = vec![usize::MAX; nrows];
        let mut nz = 0;
        for j in 0..ncols {
            let col_begin = nz;
            for pos in count[j]..count[j + 1] {
                let i = row_index[pos];
                if where_[i] != usize::MAX && where_[i] >= col_begin {
                    value[where_[i]] += value[pos];
                } else {
                    where_[i] = nz;
                    row_index[nz] = i;
                    value[nz] = value[pos];
                    nz += 1;
                }
            }
            start[j + 1] = nz;
        }
        row_index.truncate(nz);
        value.truncate(nz);

        Self::new(nrows, ncols, start, row_index, value)
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nnz(&self) -> usize {
        self.row_index.len()
    }

    /// Row indices and values of column `j`.
    pub fn column(&self, j: usize) -> (&[usize], &[f64]) {
        let range = self.start[j]..self.start[j + 1];
        (&self.row_index[range.clone()], &self.value[range])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triplets_are_summed_per_column() {
        let a = ColumnMatrix::from_triplets(
            3,
            2,
            &[(0, 0, 1.0), (2, 0, 2.0), (0, 0, 3.0), (1, 1, -1.0)],
        )
        .unwrap();
        assert_eq!(a.nnz(), 3);
        let (rows, values) = a.column(0);
        assert_eq!(rows, &[0, 2]);
        assert_eq!(values, &[4.0, 2.0]);
        let (rows, values) = a.column(1);
        assert_eq!(rows, &[1]);
        assert_eq!(values, &[-1.0]);
    }

    #[test]
    fn rejects_duplicate_rows() {
        let err = ColumnMatrix::new(2, 1, vec![0, 2], vec![1, 1], vec![1.0, 2.0]);
        assert_eq!(err, Err(Status::InvalidArgument));
    }

    #[test]
    fn rejects_row_out_of_range() {
        let err = ColumnMatrix::from_triplets(2, 2, &[(2, 0, 1.0)]);
        assert_eq!(err, Err(Status::InvalidArgument));
    }
}
