pub(crate) mod def;
pub(crate) mod file;
pub(crate) mod list;
pub(crate) mod lu;
pub(crate) mod statistics;
pub(crate) mod workspace;

mod build_factors;
mod dense;
mod dfs;
mod factorize;
mod markowitz;
mod pivot;
mod solve;
mod update;

pub use lu::LU;
pub use statistics::StageAverages;
pub use workspace::Workspace;
