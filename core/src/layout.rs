use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{GridError, OccupancyGrid, SlotCoord};

/// Number of waiting spots inside the enemy enclosure.
pub const ENCLOSURE_PENS: usize = 3;

const CENTER_PEN: usize = 1;

/// Kinds of collectible items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Regular pellet that only awards score.
    SmallPellet,
    /// Power pellet that also makes every enemy fragile.
    BigPellet,
}

/// Placement of a collectible item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ItemSeed {
    /// Kind of the item.
    pub kind: ItemKind,
    /// Slot whose centre holds the item.
    pub slot: SlotCoord,
}

/// Anchors of the enclosure enemies start in and return to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Enclosure {
    entrance: Vec2,
    entrance_slot: SlotCoord,
    pens: [Vec2; ENCLOSURE_PENS],
}

impl Enclosure {
    /// Lays the enclosure out below an entrance slot.
    ///
    /// The entrance sits on the left edge of `entrance_slot`, directly above
    /// the door. The pens line up three rows further down, two tiles apart,
    /// with the middle pen under the entrance.
    #[must_use]
    pub fn below_entrance(grid: &OccupancyGrid, entrance_slot: SlotCoord) -> Self {
        let entrance = grid.left_edge_offset(entrance_slot);
        let tile = grid.tile_size();
        let pen_y = entrance.y - 3.0 * tile.y;
        Self {
            entrance,
            entrance_slot,
            pens: [
                Vec2::new(entrance.x - 2.0 * tile.x, pen_y),
                Vec2::new(entrance.x, pen_y),
                Vec2::new(entrance.x + 2.0 * tile.x, pen_y),
            ],
        }
    }

    /// World offset in front of the enclosure door.
    #[must_use]
    pub const fn entrance(&self) -> Vec2 {
        self.entrance
    }

    /// Slot in front of the door, used as destination when routing home.
    #[must_use]
    pub const fn entrance_slot(&self) -> SlotCoord {
        self.entrance_slot
    }

    /// Waiting spots inside the enclosure, from left to right.
    #[must_use]
    pub const fn pens(&self) -> [Vec2; ENCLOSURE_PENS] {
        self.pens
    }

    /// Centre of the enclosure.
    #[must_use]
    pub const fn center(&self) -> Vec2 {
        self.pens[CENTER_PEN]
    }
}

/// Errors raised while assembling a [`StageLayout`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// The underlying grid is invalid.
    #[error(transparent)]
    Grid(#[from] GridError),
    /// The player would start inside a wall or outside the maze.
    #[error("player start slot ({row}, {column}) is not an open slot")]
    BlockedPlayerStart {
        /// Row of the start slot.
        row: i32,
        /// Column of the start slot.
        column: i32,
    },
    /// The enclosure entrance is inside a wall or outside the maze.
    #[error("enclosure entrance ({row}, {column}) is not an open slot")]
    BlockedEntrance {
        /// Row of the entrance slot.
        row: i32,
        /// Column of the entrance slot.
        column: i32,
    },
    /// An item was placed inside a wall or outside the maze.
    #[error("item at ({row}, {column}) is not on an open slot")]
    BlockedItem {
        /// Row of the item slot.
        row: i32,
        /// Column of the item slot.
        column: i32,
    },
}

/// Everything needed to populate a stage.
#[derive(Clone, Debug, PartialEq)]
pub struct StageLayout {
    grid: OccupancyGrid,
    player_start: Vec2,
    enclosure: Enclosure,
    items: Vec<ItemSeed>,
}

impl StageLayout {
    /// Assembles a layout, checking that every anchor lies on an open slot.
    pub fn new(
        grid: OccupancyGrid,
        player_start: Vec2,
        enclosure: Enclosure,
        items: Vec<ItemSeed>,
    ) -> Result<Self, LayoutError> {
        let start = grid.slot_for_offset(player_start);
        if grid.occupancy(start) != Some(false) {
            return Err(LayoutError::BlockedPlayerStart {
                row: start.row(),
                column: start.column(),
            });
        }
        let entrance = enclosure.entrance_slot();
        if grid.occupancy(entrance) != Some(false) {
            return Err(LayoutError::BlockedEntrance {
                row: entrance.row(),
                column: entrance.column(),
            });
        }
        if let Some(item) = items
            .iter()
            .find(|item| grid.occupancy(item.slot) != Some(false))
        {
            return Err(LayoutError::BlockedItem {
                row: item.slot.row(),
                column: item.slot.column(),
            });
        }

        Ok(Self {
            grid,
            player_start,
            enclosure,
            items,
        })
    }

    /// Occupancy grid of the maze.
    #[must_use]
    pub const fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    /// World offset the player starts every attempt at.
    #[must_use]
    pub const fn player_start(&self) -> Vec2 {
        self.player_start
    }

    /// Enemy enclosure anchors.
    #[must_use]
    pub const fn enclosure(&self) -> &Enclosure {
        &self.enclosure
    }

    /// Collectible items in placement order.
    #[must_use]
    pub fn items(&self) -> &[ItemSeed] {
        &self.items
    }
}
