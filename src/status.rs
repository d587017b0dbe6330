// Copyright (C) 2016-2018 ERGO-Code
// Copyright (C) 2022-2023 Richard Lincoln

/// Failure conditions reported by the factorization engine.
///
/// Singular factorizations are still usable: the rejected basis columns have
/// been replaced by slacks (see [`crate::BasisFactorization::make_non_singular`]).
/// Every other condition asks the caller to refactorize or to fix its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Status {
    /// A basis column had no nonzero entry to pivot on.
    #[error("basis matrix is structurally singular")]
    StructuralSingularity,

    /// All remaining pivot candidates failed the stability threshold.
    #[error("basis matrix is numerically singular")]
    NumericalSingularity,

    /// The update areas are full. Refactorize.
    #[error("no room left in the factor storage")]
    StorageExhaustion,

    /// `maximum_pivots` updates have been applied since the last factorization.
    #[error("maximum number of updates reached")]
    UpdateLimitReached,

    /// Two computations of the new pivot disagree.
    #[error("update rejected: pivot computations disagree")]
    AccuracyDrift,

    /// The factorization is invalid or the update was not prepared.
    #[error("invalid call: no valid factorization or no prepared update")]
    InvalidCall,

    /// A row index is out of range or a column has duplicate entries.
    #[error("invalid argument")]
    InvalidArgument,

    /// The allocator refused to grow a factor area.
    #[error("out of memory")]
    OutOfMemory,
}

impl Status {
    /// Integer return code. Singularities are negative and small, resource
    /// conditions follow.
    pub fn code(&self) -> i32 {
        match self {
            Status::StructuralSingularity => -1,
            Status::NumericalSingularity => -2,
            Status::StorageExhaustion => -3,
            Status::UpdateLimitReached => -4,
            Status::AccuracyDrift => -5,
            Status::InvalidCall => -6,
            Status::InvalidArgument => -7,
            Status::OutOfMemory => -8,
        }
    }

    /// True if the factors are still valid (with slack substitutions).
    pub fn is_singular(&self) -> bool {
        matches!(
            self,
            Status::StructuralSingularity | Status::NumericalSingularity
        )
    }
}

/// Graded outcome of checking and committing a column replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReplaceStatus {
    /// The three pivot computations agree.
    Ok,
    /// Small relative disagreement. The update was applied.
    ProbablyOk,
    /// The new pivot is too small or the computations disagree. Refactorize.
    Singular,
    /// No room in U or R for the update. Refactorize.
    NoRoom,
    /// `maximum_pivots` reached. Refactorize.
    MaximumPivots,
}

impl ReplaceStatus {
    pub fn code(&self) -> i32 {
        match self {
            ReplaceStatus::Ok => 0,
            ReplaceStatus::ProbablyOk => 1,
            ReplaceStatus::Singular => 2,
            ReplaceStatus::NoRoom => 3,
            ReplaceStatus::MaximumPivots => 5,
        }
    }

    /// True if the update may be committed.
    pub fn accepted(&self) -> bool {
        matches!(self, ReplaceStatus::Ok | ReplaceStatus::ProbablyOk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_negative_for_failures() {
        assert_eq!(Status::StructuralSingularity.code(), -1);
        assert!(Status::OutOfMemory.code() < 0);
        assert!(Status::NumericalSingularity.is_singular());
        assert!(!Status::StorageExhaustion.is_singular());
    }

    #[test]
    fn replace_codes_follow_grading() {
        assert_eq!(ReplaceStatus::Ok.code(), 0);
        assert_eq!(ReplaceStatus::NoRoom.code(), 3);
        assert_eq!(ReplaceStatus::MaximumPivots.code(), 5);
        assert!(ReplaceStatus::ProbablyOk.accepted());
        assert!(!ReplaceStatus::Singular.accepted());
        assert!(ReplaceStatus::Ok < ReplaceStatus::Singular);
    }
}
