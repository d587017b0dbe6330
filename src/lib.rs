//! Sparse LU factorization of simplex basis matrices.
//!
//! The basis is factorized with a Markowitz search under columnwise threshold
//! pivoting, switching to dense LU when the active submatrix fills in. Basis
//! changes are applied as Forrest-Tomlin updates (or product form etas)
//! until a refactorization is due. FTRAN and BTRAN pick a sparse, densish
//! or dense kernel per stage from the observed fill of earlier solves.
//!
//! ```
//! use basis_lu::{BasisFactorization, ColumnMatrix, FactorConfig, IndexedVector};
//!
//! let a = ColumnMatrix::from_triplets(2, 2, &[(0, 0, 2.0), (1, 1, 4.0)]).unwrap();
//! let mut bf = BasisFactorization::new(FactorConfig::default());
//! bf.factor(&a, &[0, 1]).unwrap();
//!
//! let mut x = IndexedVector::from_dense(&[2.0, 2.0]);
//! bf.update_column(&mut x).unwrap();
//! assert_eq!(x.values(), &[1.0, 0.5]);
//! ```

mod config;
mod factorization;
mod indexed_vector;
mod matrix;
mod status;

mod lu;

pub use config::*;
pub use factorization::*;
pub use indexed_vector::*;
pub use lu::{StageAverages, Workspace, LU};
pub use matrix::*;
pub use status::*;
