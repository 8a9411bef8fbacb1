use thiserror::Error;

/// Configuration errors raised while building a BIBD mask or a masked layer.
///
/// All of these are fatal at construction time; nothing in the forward pass
/// returns an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BibdError {
    #[error("BIBD order must be at least 2, got {order}")]
    InvalidOrder { order: usize },
    #[error("BIBD order {order} is not a prime power; the design would be unbalanced")]
    NotPrimePower { order: usize },
    #[error("weight shape {actual:?} does not match mask shape {expected:?}")]
    ShapeMismatch {
        expected: [usize; 2],
        actual: [usize; 2],
    },
}
