// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

/// Dense values plus the list of positions that may be nonzero.
///
/// Every position with a nonzero value appears in `index()`. Positions in
/// `index()` may hold zeros after cancellation; [`IndexedVector::clean`]
/// drops those.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexedVector {
    values: Vec<f64>,
    index: Vec<usize>,
}

impl IndexedVector {
    pub fn new(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
            index: Vec::with_capacity(len),
        }
    }

    /// Build from a dense slice, indexing every nonzero.
    pub fn from_dense(values: &[f64]) -> Self {
        let mut v = Self::new(values.len());
        for (i, &x) in values.iter().enumerate() {
            if x != 0.0 {
                v.values[i] = x;
                v.index.push(i);
            }
        }
        v
    }

    /// Unit vector `e_i` of length `len`.
    pub fn unit(len: usize, i: usize) -> Self {
        let mut v = Self::new(len);
        v.insert(i, 1.0);
        v
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of indexed positions.
    pub fn nnz(&self) -> usize {
        self.index.len()
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, i: usize) -> f64 {
        self.values[i]
    }

    /// Set position `i`, which must not be indexed yet.
    pub fn insert(&mut self, i: usize, x: f64) {
        debug_assert!(!self.index.contains(&i));
        self.values[i] = x;
        self.index.push(i);
    }

    /// Zero every indexed position.
    pub fn clear(&mut self) {
        if self.index.len() * 4 < self.values.len() {
            for &i in &self.index {
                self.values[i] = 0.0;
            }
        } else {
            self.values.fill(0.0);
        }
        self.index.clear();
    }

    /// Drop indexed positions whose magnitude is `<= tolerance`, zeroing them.
    pub fn clean(&mut self, tolerance: f64) -> usize {
        let values = &mut self.values;
        self.index.retain(|&i| {
            if values[i].abs() > tolerance {
                true
            } else {
                values[i] = 0.0;
                false
            }
        });
        self.index.len()
    }

    /// Rebuild the index from the dense values, dropping tiny entries.
    pub fn scan(&mut self, tolerance: f64) -> usize {
        self.index.clear();
        for (i, x) in self.values.iter_mut().enumerate() {
            if x.abs() > tolerance {
                self.index.push(i);
            } else {
                *x = 0.0;
            }
        }
        self.index.len()
    }

    /// Copy into a dense vector.
    pub fn to_dense(&self) -> Vec<f64> {
        self.values.clone()
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [f64], &mut Vec<usize>) {
        (&mut self.values, &mut self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_drops_tiny_entries() {
        let mut v = IndexedVector::new(5);
        v.insert(1, 0.0);
        v.insert(3, 1e-20);
        v.insert(4, -0.5);
        assert_eq!(v.nnz(), 3);
        assert_eq!(v.clean(1e-13), 1);
        assert_eq!(v.index(), &[4]);
        assert_eq!(v.to_dense(), vec![0.0, 0.0, 0.0, 0.0, -0.5]);
    }

    #[test]
    fn scan_rebuilds_index_in_order() {
        let mut v = IndexedVector::from_dense(&[0.0, 1.0, 0.0, -3.0]);
        assert_eq!(v.index(), &[1, 3]);
        v.clear();
        assert_eq!(v.nnz(), 0);
        assert_eq!(v.to_dense(), vec![0.0; 4]);
        v.insert(2, 5.0);
        v.insert(0, 1.0);
        assert_eq!(v.scan(0.0), 2);
        assert_eq!(v.index(), &[0, 2]);
    }
}
