//! Persisted shape of a world.
//!
//! Only the dimensions and the entity lists are stored. The per-cell beeper
//! counts and obstacle presence are rebuilt from the lists on load.

use crate::error::WorldError;
use crate::world::World;
use karel_common::Cell;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A placed beeper or obstacle as stored: `{id, row, col}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub id: Uuid,
    pub row: i32,
    pub col: i32,
}

impl PlacementRecord {
    pub fn new(id: Uuid, cell: Cell) -> Self {
        Self {
            id,
            row: cell.row,
            col: cell.col,
        }
    }

    pub fn cell(&self) -> Cell {
        Cell::new(self.row, self.col)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldRecord {
    pub num_rows: u32,
    pub num_cols: u32,
    #[serde(default)]
    pub beepers: Vec<PlacementRecord>,
    #[serde(default)]
    pub obstacles: Vec<PlacementRecord>,
}

impl From<World> for WorldRecord {
    fn from(world: World) -> Self {
        world.to_record()
    }
}

impl TryFrom<WorldRecord> for World {
    type Error = WorldError;

    fn try_from(record: WorldRecord) -> Result<Self, Self::Error> {
        World::from_record(record)
    }
}
