//! Error mapping from adapter libraries into collaborator failures

mod conversions;

pub use conversions::{map_join_error, InfraError};
