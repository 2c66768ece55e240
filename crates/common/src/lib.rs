//! Shared value types: grid cells, headings, and opaque identifiers.

pub mod types;

pub use types::{BeeperId, Cell, Heading, ObstacleId, PlaygroundId};
