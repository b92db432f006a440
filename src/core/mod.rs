/*!
 * Core Module
 * Shared errors, limits, and the parking substrate
 */

pub mod errors;
pub mod limits;
pub mod sync;

// Re-export for convenience
pub use errors::*;
