//! Wall and self collision checks for the snake's next head cell
//!
//! Collisions are decided before the growth/tail-pop decision is committed, so
//! a fatal move always wins over eating a target on the same tick.

use serde::{Deserialize, Serialize};

use super::grid::{Grid, GridPos};

/// A fatal contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collision {
    /// Head left the board
    Wall,
    /// Head entered the body; `segment` is the hit index in the moved snake
    SelfHit { segment: usize },
}

/// Check a proposed head against the board and the body it will move into.
///
/// `body` is the snake *after* the move without the new head: for a plain
/// translation the tail cell is vacated and must not be included.
pub fn check_collision(grid: &Grid, new_head: GridPos, body: &[GridPos]) -> Option<Collision> {
    if !grid.contains(new_head) {
        return Some(Collision::Wall);
    }
    body.iter()
        .position(|&seg| seg == new_head)
        .map(|i| Collision::SelfHit { segment: i + 1 })
}

/// Cells still occupied after a move (excluding the new head)
pub fn occupied_after_move(segments: &[GridPos], grows: bool) -> &[GridPos] {
    if grows || segments.is_empty() {
        segments
    } else {
        &segments[..segments.len() - 1]
    }
}
