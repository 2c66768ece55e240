//! World Kernel: authoritative grid state, beeper/obstacle placement, Karel movement.
//!
//! # Invariants
//! - The per-cell beeper counts always equal the number of beeper entities at that cell.
//! - At most one obstacle occupies a cell, and obstacle presence always matches the obstacle list.
//! - All state mutations flow through explicit operations and are recorded as events.
//! - Resizing is destructive: every beeper and obstacle is discarded.

pub mod error;
pub mod karel;
pub mod record;
pub mod world;

pub use error::WorldError;
pub use karel::{CrashCause, Karel, MoveOutcome};
pub use record::{PlacementRecord, WorldRecord};
pub use world::{Beeper, Obstacle, World, WorldEvent, DEFAULT_COLS, DEFAULT_ROWS};
