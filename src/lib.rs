//! BIBD-structured sparse linear layers.
//!
//! A balanced incomplete block design of order `r` fixes which inputs feed
//! which outputs of a linear layer: every output sees only the inputs that
//! share a block with it, and every pair of points shares exactly one block.

// Combinatorics: prime powers and GF(p^e) arithmetic for the grid pass
pub mod field;

// Incidence matrix generation and design checks
pub mod mask;

// Layer and network built on the mask
pub mod masked_linear;
pub mod model;

// Core modules
pub mod device;
pub mod error;
pub mod training;

// Re-exports for convenience
pub use error::BibdError;
pub use mask::{BibdMask, MaskOrientation, MaskSummary, generate_mask, generate_mask_checked};
pub use masked_linear::{MaskedLinear, MaskedLinearConfig};
pub use model::{BibdBlock, BibdBlockConfig, BibdMlp, BibdMlpConfig};
