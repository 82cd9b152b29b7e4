//! r2cam - Core traits, types, and constants.
//!
//! Foundational abstractions shared by the transport and session layers.

mod constants;
mod error;
mod traits;

pub use constants::*;
pub use error::*;
pub use traits::*;
