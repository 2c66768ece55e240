use crate::world::World;
use karel_common::{Cell, Heading};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Why a move attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashCause {
    /// The step would leave the grid.
    Wall,
    /// The target cell holds an obstacle.
    Obstacle(Cell),
}

/// Result of a single move attempt. A crash changes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved(Cell),
    Crashed(CrashCause),
}

impl MoveOutcome {
    pub fn is_crash(&self) -> bool {
        matches!(self, Self::Crashed(_))
    }
}

/// The robot: a position and a heading.
///
/// Karel is not owned by the world. Whoever tracks Karel must also keep it
/// off obstacle cells; [`World::has_obstacle`] is the primitive for that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Karel {
    pub cell: Cell,
    pub heading: Heading,
}

impl Karel {
    pub fn new(cell: Cell, heading: Heading) -> Self {
        Self { cell, heading }
    }

    /// Bottom-left corner of `world`, facing east.
    pub fn home(world: &World) -> Self {
        Self {
            cell: Cell::new(world.num_rows() as i32 - 1, 0),
            heading: Heading::East,
        }
    }

    /// Where one step forward would land, or the reason it cannot.
    pub fn check_move(&self, world: &World) -> Result<Cell, CrashCause> {
        let target = self.cell.step(self.heading);
        if !world.contains(target) {
            return Err(CrashCause::Wall);
        }
        if world.has_obstacle(target) {
            return Err(CrashCause::Obstacle(target));
        }
        Ok(target)
    }

    /// Step forward one cell if nothing is in the way.
    pub fn try_move(&mut self, world: &World) -> MoveOutcome {
        match self.check_move(world) {
            Ok(target) => {
                debug!(from = %self.cell, to = %target, heading = %self.heading, "karel moved");
                self.cell = target;
                MoveOutcome::Moved(target)
            }
            Err(cause) => {
                warn!(at = %self.cell, heading = %self.heading, ?cause, "karel crashed");
                MoveOutcome::Crashed(cause)
            }
        }
    }

    pub fn turn_left(&mut self) {
        self.heading = self.heading.left();
    }

    pub fn turn_right(&mut self) {
        self.heading = self.heading.right();
    }

    pub fn turn_around(&mut self) {
        self.heading = self.heading.opposite();
    }
}
