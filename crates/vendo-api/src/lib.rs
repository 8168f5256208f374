//! HTTP boundary shapes for Vendo.
//!
//! The routing layer lives in the hosting platform; this crate only owns
//! the shapes that cross the boundary: the `{success, data?, error?}`
//! envelope and the mapping from [`CommerceError`] to conventional status
//! codes.
//!
//! [`CommerceError`]: vendo_commerce::CommerceError

mod response;

pub use response::{status_for, ApiResponse};
