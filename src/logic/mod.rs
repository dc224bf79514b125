//! Core domain logic, independent of the HTTP surface.

pub mod audit;
pub mod explain;
pub mod model;
pub mod schema;
pub mod train;
