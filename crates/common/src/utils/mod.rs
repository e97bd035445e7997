//! Helper macros shared across crates
//!
//! - **[`macros`]**: `impl_status_conversions!` for string-backed enums

#[macro_use]
pub mod macros;
