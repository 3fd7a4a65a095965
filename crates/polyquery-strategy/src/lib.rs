//! Backend strategies for generated queries.
//!
//! A strategy bundles everything backend-specific about a generated query:
//! the schema summary and prompt handed to the generator, cleanup of the
//! generator's output, the safety policy, and execution through a driver.
//! The set of strategies is closed: [`Strategy`] is either relational or
//! document, and a [`StrategyRegistry`] maps backend identifiers to them.

mod clean;
mod document;
mod driver;
mod registry;
mod relational;
mod safety;
mod strategy;

#[cfg(test)]
mod testing;

pub use clean::strip_generation_artifacts;
pub use document::{DocumentStrategy, FIND_LIMIT};
pub use driver::{ColumnInfo, DocumentDriver, RelationalDriver};
pub use registry::{Strategy, StrategyRegistry};
pub use relational::RelationalStrategy;
pub use safety::SafetyPolicy;
pub use strategy::QueryStrategy;
