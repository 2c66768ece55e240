use crate::action::{Action, Tool};
use karel_common::{Cell, Heading};
use karel_kernel::{CrashCause, Karel, MoveOutcome, World, WorldError, WorldEvent};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Caller-chosen bounds on world dimensions.
///
/// The kernel accepts any positive size; a session narrows that to what its
/// front-end can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionLimits {
    pub max_rows: u32,
    pub max_cols: u32,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_rows: 10,
            max_cols: 10,
        }
    }
}

impl SessionLimits {
    pub fn allows(&self, rows: u32, cols: u32) -> bool {
        (1..=self.max_rows).contains(&rows) && (1..=self.max_cols).contains(&cols)
    }
}

/// Errors from session actions. None of them change any state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Karel crashed moving {heading} from {at}: {}", describe_crash(.cause))]
    Crashed {
        at: Cell,
        heading: Heading,
        cause: CrashCause,
    },
    #[error("no beeper at {0}")]
    NoBeeper(Cell),
    #[error("no obstacle at {0}")]
    NoObstacle(Cell),
    #[error("Karel is at {0}; an obstacle cannot go there")]
    KarelOccupies(Cell),
    #[error("Karel cannot stand on the obstacle at {0}")]
    ObstacleOccupies(Cell),
    #[error("{rows}x{cols} is outside the allowed 1..={max_rows} x 1..={max_cols}")]
    DimensionsOutOfRange {
        rows: u32,
        cols: u32,
        max_rows: u32,
        max_cols: u32,
    },
    #[error(transparent)]
    World(#[from] WorldError),
}

fn describe_crash(cause: &CrashCause) -> String {
    match cause {
        CrashCause::Wall => "hit the edge of the world".to_owned(),
        CrashCause::Obstacle(cell) => format!("hit the obstacle at {cell}"),
    }
}

/// What a successful action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Moved(Cell),
    Turned(Heading),
    BeeperPlaced { cell: Cell, count: usize },
    BeeperPicked { cell: Cell, count: usize },
    ObstaclePlaced(Cell),
    ObstacleRemoved(Cell),
    KarelPlaced(Cell),
    ToolSelected(Tool),
    Cleared,
    Resized { rows: u32, cols: u32 },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Moved(cell) => write!(f, "moved to {cell}"),
            Self::Turned(heading) => write!(f, "now facing {heading}"),
            Self::BeeperPlaced { cell, count } => write!(f, "beeper placed at {cell} ({count} there)"),
            Self::BeeperPicked { cell, count } => write!(f, "beeper picked at {cell} ({count} left)"),
            Self::ObstaclePlaced(cell) => write!(f, "obstacle placed at {cell}"),
            Self::ObstacleRemoved(cell) => write!(f, "obstacle removed at {cell}"),
            Self::KarelPlaced(cell) => write!(f, "Karel placed at {cell}"),
            Self::ToolSelected(tool) => write!(f, "tool set to {tool}"),
            Self::Cleared => f.write_str("world cleared"),
            Self::Resized { rows, cols } => write!(f, "world resized to {rows}x{cols}"),
        }
    }
}

/// One open playground: its world, Karel, and the active tool.
///
/// The session is the layer that keeps Karel off obstacles. The kernel does
/// not know where Karel is.
#[derive(Debug, Clone)]
pub struct Session {
    world: World,
    karel: Karel,
    tool: Tool,
    limits: SessionLimits,
    cleared_on_open: Option<Cell>,
}

impl Session {
    /// Open a session with Karel at the bottom-left corner facing east.
    ///
    /// If that corner holds an obstacle, Karel starts on the nearest free
    /// cell scanning upward row by row. A world with no free cell loses the
    /// obstacle in the corner; [`Session::cleared_on_open`] reports it and the
    /// removal shows up in [`Session::take_changes`].
    pub fn new(mut world: World, limits: SessionLimits) -> Self {
        let (karel, cleared_on_open) = start_position(&mut world);
        Self {
            world,
            karel,
            tool: Tool::None,
            limits,
            cleared_on_open,
        }
    }

    /// The obstacle cell removed to make room for Karel when the session
    /// opened, if any.
    pub fn cleared_on_open(&self) -> Option<Cell> {
        self.cleared_on_open
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn karel(&self) -> &Karel {
        &self.karel
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn limits(&self) -> &SessionLimits {
        &self.limits
    }

    pub fn into_world(self) -> World {
        self.world
    }

    /// Whether the world changed since the last [`Session::take_changes`].
    pub fn is_dirty(&self) -> bool {
        !self.world.events().is_empty()
    }

    /// Drain the world's event log.
    pub fn take_changes(&mut self) -> Vec<WorldEvent> {
        self.world.drain_events()
    }

    pub fn apply(&mut self, action: Action) -> Result<Outcome, SessionError> {
        debug!(?action, "applying action");
        match action {
            Action::Move => self.move_forward(),
            Action::TurnLeft => Ok(self.turn_left()),
            Action::TurnRight => Ok(self.turn_right()),
            Action::TurnAround => Ok(self.turn_around()),
            Action::PutBeeper => self.put_beeper(),
            Action::PickBeeper => self.pick_beeper(),
            Action::SelectTool(tool) => Ok(self.set_tool(tool)),
            Action::Tap(cell) => self.tap(cell),
            Action::Clear => Ok(self.clear_world()),
            Action::Resize { rows, cols } => self.resize(rows, cols),
        }
    }

    pub fn move_forward(&mut self) -> Result<Outcome, SessionError> {
        let at = self.karel.cell;
        match self.karel.try_move(&self.world) {
            MoveOutcome::Moved(cell) => Ok(Outcome::Moved(cell)),
            MoveOutcome::Crashed(cause) => Err(SessionError::Crashed {
                at,
                heading: self.karel.heading,
                cause,
            }),
        }
    }

    pub fn turn_left(&mut self) -> Outcome {
        self.karel.turn_left();
        Outcome::Turned(self.karel.heading)
    }

    pub fn turn_right(&mut self) -> Outcome {
        self.karel.turn_right();
        Outcome::Turned(self.karel.heading)
    }

    pub fn turn_around(&mut self) -> Outcome {
        self.karel.turn_around();
        Outcome::Turned(self.karel.heading)
    }

    /// Drop a beeper on Karel's cell.
    pub fn put_beeper(&mut self) -> Result<Outcome, SessionError> {
        self.place_beeper(self.karel.cell)
    }

    /// Pick up a beeper from Karel's cell.
    pub fn pick_beeper(&mut self) -> Result<Outcome, SessionError> {
        self.take_beeper(self.karel.cell)
    }

    pub fn set_tool(&mut self, tool: Tool) -> Outcome {
        self.tool = tool;
        Outcome::ToolSelected(tool)
    }

    /// Apply the active tool to `cell`. With no tool, Karel jumps there.
    pub fn tap(&mut self, cell: Cell) -> Result<Outcome, SessionError> {
        match self.tool {
            Tool::AddBeeper => self.place_beeper(cell),
            Tool::RemoveBeeper => self.take_beeper(cell),
            Tool::AddObstacle => {
                if cell == self.karel.cell {
                    warn!(%cell, "obstacle refused on Karel's cell");
                    return Err(SessionError::KarelOccupies(cell));
                }
                self.world.add_obstacle(cell)?;
                Ok(Outcome::ObstaclePlaced(cell))
            }
            Tool::RemoveObstacle => {
                self.world
                    .remove_obstacle(cell)
                    .ok_or(SessionError::NoObstacle(cell))?;
                Ok(Outcome::ObstacleRemoved(cell))
            }
            Tool::None => {
                if !self.world.contains(cell) {
                    return Err(SessionError::World(WorldError::OutOfBounds {
                        cell,
                        rows: self.world.num_rows(),
                        cols: self.world.num_cols(),
                    }));
                }
                if self.world.has_obstacle(cell) {
                    warn!(%cell, "Karel refused on obstacle");
                    return Err(SessionError::ObstacleOccupies(cell));
                }
                self.karel.cell = cell;
                Ok(Outcome::KarelPlaced(cell))
            }
        }
    }

    /// Remove every beeper and every obstacle.
    pub fn clear_world(&mut self) -> Outcome {
        self.world.remove_all_beepers();
        self.world.remove_all_obstacles();
        Outcome::Cleared
    }

    /// Resize within the session limits. The world is emptied; Karel keeps
    /// its place and heading if the cell still exists, otherwise it returns
    /// to the bottom-left corner.
    pub fn resize(&mut self, rows: u32, cols: u32) -> Result<Outcome, SessionError> {
        if !self.limits.allows(rows, cols) {
            return Err(SessionError::DimensionsOutOfRange {
                rows,
                cols,
                max_rows: self.limits.max_rows,
                max_cols: self.limits.max_cols,
            });
        }
        self.world.resize(rows, cols)?;
        if !self.world.contains(self.karel.cell) {
            self.karel.cell = Karel::home(&self.world).cell;
            debug!(cell = %self.karel.cell, "Karel returned home after resize");
        }
        Ok(Outcome::Resized { rows, cols })
    }

    fn place_beeper(&mut self, cell: Cell) -> Result<Outcome, SessionError> {
        self.world.add_beeper(cell)?;
        Ok(Outcome::BeeperPlaced {
            cell,
            count: self.world.beeper_count(cell),
        })
    }

    fn take_beeper(&mut self, cell: Cell) -> Result<Outcome, SessionError> {
        self.world
            .remove_beeper(cell)
            .ok_or(SessionError::NoBeeper(cell))?;
        Ok(Outcome::BeeperPicked {
            cell,
            count: self.world.beeper_count(cell),
        })
    }
}

fn start_position(world: &mut World) -> (Karel, Option<Cell>) {
    let mut karel = Karel::home(world);
    let free = (0..world.num_rows() as i32)
        .rev()
        .flat_map(|row| (0..world.num_cols() as i32).map(move |col| Cell::new(row, col)))
        .find(|cell| !world.has_obstacle(*cell));
    match free {
        Some(cell) => {
            karel.cell = cell;
            (karel, None)
        }
        None => {
            info!(cell = %karel.cell, "world is full of obstacles, clearing Karel's corner");
            let cleared = world.remove_obstacle(karel.cell).map(|o| o.cell);
            (karel, cleared)
        }
    }
}
