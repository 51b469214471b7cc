//! Grid geometry: cells, directions and board bounds

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// An integer grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell one step along `dir` (same cell for `Idle`)
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Top-left pixel corner of this cell
    pub fn to_pixels(self, cell_size: i32) -> Vec2 {
        Vec2::new((self.x * cell_size) as f32, (self.y * cell_size) as f32)
    }
}

/// Movement direction on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    /// Not moving (before the first committed move)
    #[default]
    Idle,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit cell offset (screen coordinates, y grows downward)
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Idle => (0, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Idle => Direction::Idle,
        }
    }

    pub fn is_idle(self) -> bool {
        self == Direction::Idle
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    /// True when both directions move and cross at a right angle
    pub fn is_perpendicular(self, other: Direction) -> bool {
        (self.is_horizontal() && other.is_vertical())
            || (self.is_vertical() && other.is_horizontal())
    }

    /// Direction from `from` to an adjacent cell `to`
    pub fn between(from: GridPos, to: GridPos) -> Self {
        match (to.x - from.x, to.y - from.y) {
            (0, -1) => Direction::Up,
            (0, 1) => Direction::Down,
            (-1, 0) => Direction::Left,
            (1, 0) => Direction::Right,
            _ => Direction::Idle,
        }
    }

    /// Map a keyboard key name to a direction (arrows and WASD, any case)
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "arrowup" | "up" | "w" => Some(Direction::Up),
            "arrowdown" | "down" | "s" => Some(Direction::Down),
            "arrowleft" | "left" | "a" => Some(Direction::Left),
            "arrowright" | "right" | "d" => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Board bounds and the band reserved for the question panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    /// Rows at the top that never receive targets
    pub reserved_rows: i32,
    pub cell_size: i32,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            width: GRID_WIDTH,
            height: GRID_HEIGHT,
            reserved_rows: RESERVED_ROWS,
            cell_size: CELL_SIZE,
        }
    }
}

impl Grid {
    pub fn contains(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }
}

/// Canonical three-segment starting layout, head first, facing right
pub fn initial_snake() -> Vec<GridPos> {
    vec![GridPos::new(4, 8), GridPos::new(3, 8), GridPos::new(2, 8)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposites_and_perpendiculars() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            assert!(!dir.is_perpendicular(dir));
            assert!(!dir.is_perpendicular(dir.opposite()));
        }
        assert!(Direction::Up.is_perpendicular(Direction::Left));
        assert!(!Direction::Idle.is_perpendicular(Direction::Left));
    }

    #[test]
    fn test_from_key() {
        assert_eq!(Direction::from_key("ArrowUp"), Some(Direction::Up));
        assert_eq!(Direction::from_key("D"), Some(Direction::Right));
        assert_eq!(Direction::from_key("q"), None);
    }

    #[test]
    fn test_initial_snake_faces_right() {
        let snake = initial_snake();
        assert_eq!(snake.len(), 3);
        assert_eq!(Direction::between(snake[1], snake[0]), Direction::Right);
    }

    #[test]
    fn test_default_grid_matches_board() {
        let grid = Grid::default();
        assert_eq!(grid.width, 37);
        assert_eq!(grid.height, 29);
        assert_eq!(grid.reserved_rows, 5);
        assert!(grid.contains(GridPos::new(36, 28)));
        assert!(!grid.contains(GridPos::new(37, 0)));
        assert!(!grid.contains(GridPos::new(0, -1)));
    }
}
