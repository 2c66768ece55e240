use karel_common::Cell;

/// Errors from world construction, mutation, and record validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("invalid world dimensions {rows}x{cols}")]
    InvalidDimensions { rows: u32, cols: u32 },
    #[error("cell {cell} is outside the {rows}x{cols} world")]
    OutOfBounds { cell: Cell, rows: u32, cols: u32 },
    #[error("cell {0} already holds an obstacle")]
    ObstacleAlreadyPresent(Cell),
    #[error("invalid world record: {0}")]
    InvalidRecord(String),
}
