//! Playground authoring: a session pairs one world with Karel and applies
//! user actions to both.
//!
//! # Invariants
//! - Karel never shares a cell with an obstacle.
//! - Every failed action leaves the world and Karel unchanged.

pub mod action;
pub mod session;

pub use action::{Action, ParseActionError, Tool};
pub use session::{Outcome, Session, SessionError, SessionLimits};
