//! Collaborator interfaces for lapse
//!
//! This crate defines the narrow boundary between the policy engine and the
//! outside world: where instances come from, who carries out instructions,
//! and who receives run reports. It contains no cloud or network code
//! itself, only the traits and in-memory mocks for tests.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
