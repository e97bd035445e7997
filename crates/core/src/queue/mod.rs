//! Queue ports and write-behind delivery

pub mod ports;
pub mod write_behind;
