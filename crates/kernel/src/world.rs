use crate::error::WorldError;
use crate::record::{PlacementRecord, WorldRecord};
use karel_common::{BeeperId, Cell, ObstacleId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};
use uuid::Uuid;

/// Rows in a freshly created playground.
pub const DEFAULT_ROWS: u32 = 5;
/// Columns in a freshly created playground.
pub const DEFAULT_COLS: u32 = 5;

/// Largest dimension whose cells are still addressable with `i32` coordinates.
const MAX_DIMENSION: u32 = i32::MAX as u32;

/// An event record produced by every applied mutation to the world.
///
/// Cascading effects are recorded as their own events, so a consumer sees
/// every beeper and obstacle that came or went. Operations that turn out to
/// be no-ops record nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldEvent {
    BeeperAdded { id: BeeperId, cell: Cell },
    BeeperRemoved { id: BeeperId, cell: Cell },
    ObstacleAdded { id: ObstacleId, cell: Cell },
    ObstacleRemoved { id: ObstacleId, cell: Cell },
    /// Every beeper was removed at once.
    BeepersCleared { count: usize },
    /// Every obstacle was removed at once.
    ObstaclesCleared { count: usize },
    /// Dimensions changed and the grid was emptied.
    Resized { num_rows: u32, num_cols: u32 },
}

/// A placed beeper. Several may share a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beeper {
    pub id: BeeperId,
    pub cell: Cell,
}

/// A placed obstacle. At most one per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub cell: Cell,
}

/// The authoritative world state.
///
/// Owns the grid dimensions and every beeper and obstacle. The entity lists
/// are the source of truth; `beeper_counts` and `obstacle_cells` are derived
/// indexes kept in lockstep by every mutation. Both indexes are sparse: a
/// cell that is absent holds zero beepers and no obstacle.
///
/// Serializes through [`WorldRecord`]; the indexes are rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "WorldRecord", try_from = "WorldRecord")]
pub struct World {
    num_rows: u32,
    num_cols: u32,
    beepers: Vec<Beeper>,
    obstacles: Vec<Obstacle>,
    beeper_counts: BTreeMap<Cell, usize>,
    obstacle_cells: BTreeMap<Cell, ObstacleId>,
    /// Append-only log of applied mutations. Not persisted.
    event_log: Vec<WorldEvent>,
}

impl Default for World {
    /// An empty 5x5 world.
    fn default() -> Self {
        Self::empty(DEFAULT_ROWS, DEFAULT_COLS)
    }
}

impl World {
    /// Create an empty world. Fails if either dimension is zero.
    pub fn new(num_rows: u32, num_cols: u32) -> Result<Self, WorldError> {
        validate_dimensions(num_rows, num_cols)?;
        Ok(Self::empty(num_rows, num_cols))
    }

    fn empty(num_rows: u32, num_cols: u32) -> Self {
        Self {
            num_rows,
            num_cols,
            beepers: Vec::new(),
            obstacles: Vec::new(),
            beeper_counts: BTreeMap::new(),
            obstacle_cells: BTreeMap::new(),
            event_log: Vec::new(),
        }
    }

    pub fn num_rows(&self) -> u32 {
        self.num_rows
    }

    pub fn num_cols(&self) -> u32 {
        self.num_cols
    }

    /// Whether `cell` lies inside `[0, num_rows) x [0, num_cols)`.
    pub fn contains(&self, cell: Cell) -> bool {
        cell.row >= 0
            && cell.col >= 0
            && (cell.row as u32) < self.num_rows
            && (cell.col as u32) < self.num_cols
    }

    /// Number of beepers stacked on `cell`; 0 outside the grid.
    pub fn beeper_count(&self, cell: Cell) -> usize {
        self.beeper_counts.get(&cell).copied().unwrap_or(0)
    }

    pub fn has_obstacle(&self, cell: Cell) -> bool {
        self.obstacle_cells.contains_key(&cell)
    }

    /// All beepers, in placement order.
    pub fn beepers(&self) -> &[Beeper] {
        &self.beepers
    }

    /// All obstacles, in placement order.
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Cells holding at least one beeper, with their counts, in row-major order.
    pub fn beeper_cells(&self) -> impl Iterator<Item = (Cell, usize)> + '_ {
        self.beeper_counts.iter().map(|(cell, n)| (*cell, *n))
    }

    /// Cells holding an obstacle, in row-major order.
    pub fn obstacle_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.obstacle_cells.keys().copied()
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Place a beeper on `cell`, first evicting any obstacle there.
    pub fn add_beeper(&mut self, cell: Cell) -> Result<BeeperId, WorldError> {
        self.ensure_contains(cell)?;
        self.remove_obstacle(cell);

        let id = BeeperId::new();
        self.beepers.push(Beeper { id, cell });
        *self.beeper_counts.entry(cell).or_insert(0) += 1;
        self.event_log.push(WorldEvent::BeeperAdded { id, cell });
        debug!(%cell, count = self.beeper_count(cell), "beeper added");
        Ok(id)
    }

    /// Remove one beeper from `cell`. Which of several stacked beepers goes is
    /// unspecified. Returns `None` when the cell holds none.
    pub fn remove_beeper(&mut self, cell: Cell) -> Option<Beeper> {
        let index = self.beepers.iter().position(|b| b.cell == cell)?;
        let beeper = self.beepers.remove(index);
        self.decrement_count(cell);
        self.event_log.push(WorldEvent::BeeperRemoved {
            id: beeper.id,
            cell,
        });
        debug!(%cell, count = self.beeper_count(cell), "beeper removed");
        Some(beeper)
    }

    /// Place an obstacle on `cell`.
    ///
    /// Beepers on the cell are removed along with their count, so the
    /// beeper list and the counts never disagree. A second obstacle on the
    /// same cell is rejected.
    pub fn add_obstacle(&mut self, cell: Cell) -> Result<ObstacleId, WorldError> {
        self.ensure_contains(cell)?;
        if self.has_obstacle(cell) {
            warn!(%cell, "obstacle already present");
            return Err(WorldError::ObstacleAlreadyPresent(cell));
        }

        while self.remove_beeper(cell).is_some() {}

        let id = ObstacleId::new();
        self.obstacles.push(Obstacle { id, cell });
        self.obstacle_cells.insert(cell, id);
        self.event_log.push(WorldEvent::ObstacleAdded { id, cell });
        debug!(%cell, "obstacle added");
        Ok(id)
    }

    /// Remove the obstacle on `cell`, if any.
    pub fn remove_obstacle(&mut self, cell: Cell) -> Option<Obstacle> {
        let id = self.obstacle_cells.remove(&cell)?;
        self.obstacles.retain(|o| o.id != id);
        self.event_log.push(WorldEvent::ObstacleRemoved { id, cell });
        debug!(%cell, "obstacle removed");
        Some(Obstacle { id, cell })
    }

    pub fn remove_all_beepers(&mut self) {
        let count = self.beepers.len();
        if count == 0 {
            return;
        }
        self.beepers.clear();
        self.beeper_counts.clear();
        self.event_log.push(WorldEvent::BeepersCleared { count });
        debug!(count, "all beepers removed");
    }

    pub fn remove_all_obstacles(&mut self) {
        let count = self.obstacles.len();
        if count == 0 {
            return;
        }
        self.obstacles.clear();
        self.obstacle_cells.clear();
        self.event_log.push(WorldEvent::ObstaclesCleared { count });
        debug!(count, "all obstacles removed");
    }

    /// Change the dimensions and discard every beeper and obstacle, even
    /// those that would still fit.
    pub fn resize(&mut self, num_rows: u32, num_cols: u32) -> Result<(), WorldError> {
        validate_dimensions(num_rows, num_cols)?;
        self.num_rows = num_rows;
        self.num_cols = num_cols;
        self.beepers.clear();
        self.obstacles.clear();
        self.beeper_counts.clear();
        self.obstacle_cells.clear();
        self.event_log
            .push(WorldEvent::Resized { num_rows, num_cols });
        debug!(num_rows, num_cols, "world resized");
        Ok(())
    }

    /// The persisted shape of this world.
    pub fn to_record(&self) -> WorldRecord {
        WorldRecord {
            num_rows: self.num_rows,
            num_cols: self.num_cols,
            beepers: self
                .beepers
                .iter()
                .map(|b| PlacementRecord::new(b.id.0, b.cell))
                .collect(),
            obstacles: self
                .obstacles
                .iter()
                .map(|o| PlacementRecord::new(o.id.0, o.cell))
                .collect(),
        }
    }

    /// Rebuild a world from its persisted shape, recomputing the derived
    /// counts. Rejects invalid dimensions, out-of-bounds placements,
    /// duplicate ids, and two obstacles on one cell.
    pub fn from_record(record: WorldRecord) -> Result<Self, WorldError> {
        let mut world = Self::new(record.num_rows, record.num_cols)
            .map_err(|e| WorldError::InvalidRecord(e.to_string()))?;

        let mut seen = HashSet::new();
        for placement in &record.beepers {
            let cell = placement.cell();
            world.ensure_record_placement(cell, placement, &mut seen)?;
            world.beepers.push(Beeper {
                id: BeeperId(placement.id),
                cell,
            });
            *world.beeper_counts.entry(cell).or_insert(0) += 1;
        }
        for placement in &record.obstacles {
            let cell = placement.cell();
            world.ensure_record_placement(cell, placement, &mut seen)?;
            let id = ObstacleId(placement.id);
            if world.obstacle_cells.insert(cell, id).is_some() {
                return Err(WorldError::InvalidRecord(format!(
                    "two obstacles at {cell}"
                )));
            }
            world.obstacles.push(Obstacle { id, cell });
        }
        Ok(world)
    }

    fn ensure_record_placement(
        &self,
        cell: Cell,
        placement: &PlacementRecord,
        seen: &mut HashSet<Uuid>,
    ) -> Result<(), WorldError> {
        if !self.contains(cell) {
            return Err(WorldError::InvalidRecord(format!(
                "placement {} at {cell} is outside the {}x{} world",
                placement.id, self.num_rows, self.num_cols
            )));
        }
        if !seen.insert(placement.id) {
            return Err(WorldError::InvalidRecord(format!(
                "duplicate id {}",
                placement.id
            )));
        }
        Ok(())
    }

    fn ensure_contains(&self, cell: Cell) -> Result<(), WorldError> {
        if self.contains(cell) {
            Ok(())
        } else {
            warn!(%cell, rows = self.num_rows, cols = self.num_cols, "cell out of bounds");
            Err(WorldError::OutOfBounds {
                cell,
                rows: self.num_rows,
                cols: self.num_cols,
            })
        }
    }

    fn decrement_count(&mut self, cell: Cell) {
        if let Some(n) = self.beeper_counts.get_mut(&cell) {
            *n -= 1;
            if *n == 0 {
                self.beeper_counts.remove(&cell);
            }
        }
    }
}

fn validate_dimensions(num_rows: u32, num_cols: u32) -> Result<(), WorldError> {
    if num_rows == 0 || num_cols == 0 || num_rows > MAX_DIMENSION || num_cols > MAX_DIMENSION {
        return Err(WorldError::InvalidDimensions {
            rows: num_rows,
            cols: num_cols,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_cells(world: &World) -> Vec<Cell> {
        let mut cells = Vec::new();
        for row in 0..world.num_rows() as i32 {
            for col in 0..world.num_cols() as i32 {
                cells.push(Cell::new(row, col));
            }
        }
        cells
    }

    /// Recount from the entity lists and compare with the derived indexes.
    fn assert_consistent(world: &World) {
        for cell in all_cells(world) {
            let listed = world.beepers().iter().filter(|b| b.cell == cell).count();
            assert_eq!(world.beeper_count(cell), listed, "beeper count at {cell}");
            let obstacles = world.obstacles().iter().filter(|o| o.cell == cell).count();
            assert!(obstacles <= 1, "more than one obstacle at {cell}");
            assert_eq!(world.has_obstacle(cell), obstacles == 1, "obstacle at {cell}");
        }
    }

    #[test]
    fn world_starts_empty() {
        let w = World::new(4, 6).unwrap();
        assert_eq!(w.num_rows(), 4);
        assert_eq!(w.num_cols(), 6);
        assert!(w.beepers().is_empty());
        assert!(w.obstacles().is_empty());
        for cell in all_cells(&w) {
            assert_eq!(w.beeper_count(cell), 0);
            assert!(!w.has_obstacle(cell));
        }
    }

    #[test]
    fn default_world_is_five_by_five() {
        let w = World::default();
        assert_eq!((w.num_rows(), w.num_cols()), (DEFAULT_ROWS, DEFAULT_COLS));
    }

    #[test]
    fn zero_dimensions_rejected() {
        assert_eq!(
            World::new(0, 3).unwrap_err(),
            WorldError::InvalidDimensions { rows: 0, cols: 3 }
        );
        assert!(World::new(3, 0).is_err());
    }

    #[test]
    fn no_fixed_upper_bound_on_dimensions() {
        let w = World::new(50, 200).unwrap();
        assert!(w.contains(Cell::new(49, 199)));
        assert!(!w.contains(Cell::new(50, 0)));
    }

    #[test]
    fn add_beeper_increments_count() {
        let mut w = World::new(5, 5).unwrap();
        let cell = Cell::new(2, 2);
        for expected in 1..=4 {
            w.add_beeper(cell).unwrap();
            assert_eq!(w.beeper_count(cell), expected);
        }
        assert_eq!(w.beepers().len(), 4);
        assert_consistent(&w);
    }

    #[test]
    fn remove_beeper_decrements_count() {
        let mut w = World::new(5, 5).unwrap();
        let cell = Cell::new(1, 3);
        w.add_beeper(cell).unwrap();
        w.add_beeper(cell).unwrap();
        w.add_beeper(Cell::new(0, 0)).unwrap();

        let removed = w.remove_beeper(cell).unwrap();
        assert_eq!(removed.cell, cell);
        assert_eq!(w.beeper_count(cell), 1);
        assert_eq!(w.beeper_count(Cell::new(0, 0)), 1);
        assert_consistent(&w);
    }

    #[test]
    fn remove_beeper_from_empty_cell_is_noop() {
        let mut w = World::new(5, 5).unwrap();
        let cell = Cell::new(4, 4);
        assert!(w.remove_beeper(cell).is_none());
        assert_eq!(w.beeper_count(cell), 0);
        assert!(w.events().is_empty());
    }

    #[test]
    fn out_of_bounds_queries_are_empty() {
        let w = World::new(2, 2).unwrap();
        assert_eq!(w.beeper_count(Cell::new(-1, 0)), 0);
        assert_eq!(w.beeper_count(Cell::new(5, 5)), 0);
        assert!(!w.has_obstacle(Cell::new(0, 9)));
    }

    #[test]
    fn out_of_bounds_placement_rejected() {
        let mut w = World::new(2, 2).unwrap();
        assert!(matches!(
            w.add_beeper(Cell::new(2, 0)),
            Err(WorldError::OutOfBounds { .. })
        ));
        assert!(w.add_obstacle(Cell::new(0, -1)).is_err());
        assert!(w.beepers().is_empty());
        assert!(w.obstacles().is_empty());
    }

    #[test]
    fn obstacle_presence_follows_add_and_remove() {
        let mut w = World::new(5, 5).unwrap();
        let cell = Cell::new(3, 1);
        w.add_obstacle(cell).unwrap();
        assert!(w.has_obstacle(cell));
        let removed = w.remove_obstacle(cell).unwrap();
        assert_eq!(removed.cell, cell);
        assert!(!w.has_obstacle(cell));
        assert!(w.obstacles().is_empty());
    }

    #[test]
    fn second_obstacle_on_cell_rejected() {
        let mut w = World::new(5, 5).unwrap();
        let cell = Cell::new(0, 0);
        w.add_obstacle(cell).unwrap();
        assert_eq!(
            w.add_obstacle(cell).unwrap_err(),
            WorldError::ObstacleAlreadyPresent(cell)
        );
        assert_eq!(w.obstacles().len(), 1);
    }

    #[test]
    fn remove_missing_obstacle_is_noop() {
        let mut w = World::new(5, 5).unwrap();
        assert!(w.remove_obstacle(Cell::new(1, 1)).is_none());
        assert!(w.events().is_empty());
    }

    #[test]
    fn beeper_evicts_obstacle() {
        let mut w = World::new(5, 5).unwrap();
        let cell = Cell::new(2, 2);
        w.add_obstacle(cell).unwrap();
        w.add_beeper(cell).unwrap();
        assert!(!w.has_obstacle(cell));
        assert_eq!(w.beeper_count(cell), 1);
        assert!(w.obstacles().is_empty());
        assert_consistent(&w);
    }

    #[test]
    fn obstacle_clears_beepers_from_list_and_count() {
        let mut w = World::new(5, 5).unwrap();
        let cell = Cell::new(2, 2);
        w.add_beeper(cell).unwrap();
        w.add_beeper(cell).unwrap();
        w.add_beeper(Cell::new(2, 3)).unwrap();
        w.add_obstacle(cell).unwrap();

        assert_eq!(w.beeper_count(cell), 0);
        assert!(w.beepers().iter().all(|b| b.cell != cell));
        assert_eq!(w.beepers().len(), 1);
        assert_consistent(&w);
    }

    #[test]
    fn remove_all_beepers_clears_every_cell() {
        let mut w = World::new(3, 3).unwrap();
        w.add_beeper(Cell::new(0, 0)).unwrap();
        w.add_beeper(Cell::new(2, 2)).unwrap();
        w.add_beeper(Cell::new(2, 2)).unwrap();
        w.add_obstacle(Cell::new(1, 1)).unwrap();
        w.remove_all_beepers();

        assert!(w.beepers().is_empty());
        for cell in all_cells(&w) {
            assert_eq!(w.beeper_count(cell), 0);
        }
        assert!(w.has_obstacle(Cell::new(1, 1)));
    }

    #[test]
    fn remove_all_obstacles_clears_every_cell() {
        let mut w = World::new(3, 3).unwrap();
        w.add_obstacle(Cell::new(0, 0)).unwrap();
        w.add_obstacle(Cell::new(1, 2)).unwrap();
        w.add_beeper(Cell::new(2, 2)).unwrap();
        w.remove_all_obstacles();

        assert!(w.obstacles().is_empty());
        for cell in all_cells(&w) {
            assert!(!w.has_obstacle(cell));
        }
        assert_eq!(w.beeper_count(Cell::new(2, 2)), 1);
    }

    #[test]
    fn resize_discards_everything() {
        let mut w = World::new(5, 5).unwrap();
        w.add_beeper(Cell::new(0, 0)).unwrap();
        w.add_beeper(Cell::new(4, 4)).unwrap();
        w.add_obstacle(Cell::new(1, 1)).unwrap();

        // Growing keeps nothing, even cells that still exist.
        w.resize(7, 8).unwrap();
        assert_eq!((w.num_rows(), w.num_cols()), (7, 8));
        assert!(w.beepers().is_empty());
        assert!(w.obstacles().is_empty());
        for cell in all_cells(&w) {
            assert_eq!(w.beeper_count(cell), 0);
            assert!(!w.has_obstacle(cell));
        }

        w.add_beeper(Cell::new(0, 0)).unwrap();
        w.resize(2, 2).unwrap();
        assert_eq!(w.beeper_count(Cell::new(0, 0)), 0);
    }

    #[test]
    fn invalid_resize_leaves_world_untouched() {
        let mut w = World::new(3, 3).unwrap();
        w.add_beeper(Cell::new(1, 1)).unwrap();
        assert!(w.resize(0, 4).is_err());
        assert_eq!((w.num_rows(), w.num_cols()), (3, 3));
        assert_eq!(w.beeper_count(Cell::new(1, 1)), 1);
    }

    #[test]
    fn events_are_recorded() {
        let mut w = World::new(3, 3).unwrap();
        let cell = Cell::new(1, 1);
        let id = w.add_beeper(cell).unwrap();
        w.add_obstacle(cell).unwrap();
        w.remove_all_obstacles();

        let events = w.drain_events();
        assert_eq!(events.len(), 4); // add + cascade remove + obstacle + clear
        assert_eq!(events[0], WorldEvent::BeeperAdded { id, cell });
        assert_eq!(events[1], WorldEvent::BeeperRemoved { id, cell });
        assert!(matches!(events[2], WorldEvent::ObstacleAdded { .. }));
        assert_eq!(events[3], WorldEvent::ObstaclesCleared { count: 1 });
        assert!(w.events().is_empty());
    }

    #[test]
    fn clearing_empty_world_records_nothing() {
        let mut w = World::new(3, 3).unwrap();
        w.remove_all_beepers();
        w.remove_all_obstacles();
        assert!(w.events().is_empty());
    }

    #[test]
    fn serde_roundtrip_preserves_queries() {
        let mut w = World::new(4, 5).unwrap();
        for (row, col) in [(0, 0), (0, 0), (0, 0), (3, 4), (2, 1)] {
            w.add_beeper(Cell::new(row, col)).unwrap();
        }
        for (row, col) in [(1, 1), (1, 2), (3, 0)] {
            w.add_obstacle(Cell::new(row, col)).unwrap();
        }
        w.remove_beeper(Cell::new(2, 1));

        let json = serde_json::to_string(&w).unwrap();
        let loaded: World = serde_json::from_str(&json).unwrap();

        assert_eq!((loaded.num_rows(), loaded.num_cols()), (4, 5));
        for cell in all_cells(&w) {
            assert_eq!(loaded.beeper_count(cell), w.beeper_count(cell));
            assert_eq!(loaded.has_obstacle(cell), w.has_obstacle(cell));
        }
        assert_eq!(loaded.beepers(), w.beepers());
        assert_eq!(loaded.obstacles(), w.obstacles());
        assert!(loaded.events().is_empty());
        assert_consistent(&loaded);
    }

    #[test]
    fn mixed_mutations_stay_consistent() {
        let mut w = World::new(4, 4).unwrap();
        for i in 0..40i32 {
            let cell = Cell::new(i % 4, (i * 7) % 4);
            match i % 5 {
                0 | 1 => {
                    w.add_beeper(cell).unwrap();
                }
                2 => {
                    w.remove_beeper(cell);
                }
                3 => {
                    let _ = w.add_obstacle(cell);
                }
                _ => {
                    w.remove_obstacle(cell);
                }
            }
            assert_consistent(&w);
        }
    }
}
