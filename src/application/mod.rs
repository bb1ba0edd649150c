//! Application services layer.

pub mod error;
pub mod lookup;
pub mod records;
pub mod repos;
