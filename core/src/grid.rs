use glam::Vec2;

use crate::SlotCoord;

/// Code written for occupied slots by [`OccupancyGrid::linear_occupancy`].
pub const WALL_CODE: u8 = 1;

/// Code written for open slots by [`OccupancyGrid::linear_occupancy`].
pub const OPEN_CODE: u8 = 0;

const WALL_GLYPH: char = '#';

/// Errors raised while building an [`OccupancyGrid`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// The grid has no rows or no columns.
    #[error("grid must contain at least one row and one column")]
    Empty,
    /// The grid exceeds the addressable coordinate range.
    #[error("grid of {rows}x{columns} slots exceeds the supported size")]
    TooLarge {
        /// Requested number of rows.
        rows: u32,
        /// Requested number of columns.
        columns: u32,
    },
    /// The occupancy table does not match the grid dimensions.
    #[error("expected {expected} occupancy entries, found {found}")]
    CellCountMismatch {
        /// Number of entries implied by the dimensions.
        expected: usize,
        /// Number of entries provided.
        found: usize,
    },
    /// A row of a textual pattern differs in length from the first row.
    #[error("row {row} holds {found} slots but the first row holds {expected}")]
    RaggedRow {
        /// Zero-based index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
    /// A tile dimension is zero, negative or not finite.
    #[error("tile dimensions must be positive and finite")]
    InvalidTileSize,
}

/// Immutable rows by columns table of blocked slots.
///
/// World offsets grow rightwards along `x` and upwards along `y`, while rows
/// grow downwards, so the slot `(row, column)` spans
/// `x ∈ [column·w, (column+1)·w)` and `y ∈ (-(row+1)·h, -row·h]`.
#[derive(Clone, Debug, PartialEq)]
pub struct OccupancyGrid {
    rows: u32,
    columns: u32,
    tile_size: Vec2,
    occupied: Vec<bool>,
}

impl OccupancyGrid {
    /// Builds a grid from a row-major occupancy table.
    pub fn new(
        rows: u32,
        columns: u32,
        tile_width: f32,
        tile_height: f32,
        occupied: Vec<bool>,
    ) -> Result<Self, GridError> {
        if rows == 0 || columns == 0 {
            return Err(GridError::Empty);
        }
        if i32::try_from(rows).is_err() || i32::try_from(columns).is_err() {
            return Err(GridError::TooLarge { rows, columns });
        }
        if !(tile_width.is_finite() && tile_height.is_finite())
            || tile_width <= 0.0
            || tile_height <= 0.0
        {
            return Err(GridError::InvalidTileSize);
        }
        let expected = usize::try_from(u64::from(rows) * u64::from(columns))
            .map_err(|_| GridError::TooLarge { rows, columns })?;
        if occupied.len() != expected {
            return Err(GridError::CellCountMismatch {
                expected,
                found: occupied.len(),
            });
        }

        Ok(Self {
            rows,
            columns,
            tile_size: Vec2::new(tile_width, tile_height),
            occupied,
        })
    }

    /// Builds a grid from text rows where `#` marks a blocked slot.
    pub fn from_pattern<S: AsRef<str>>(
        pattern: &[S],
        tile_width: f32,
        tile_height: f32,
    ) -> Result<Self, GridError> {
        let expected = pattern.first().map_or(0, |row| row.as_ref().chars().count());
        let mut occupied = Vec::with_capacity(expected * pattern.len());
        for (index, row) in pattern.iter().enumerate() {
            let found = row.as_ref().chars().count();
            if found != expected {
                return Err(GridError::RaggedRow {
                    row: index,
                    expected,
                    found,
                });
            }
            occupied.extend(row.as_ref().chars().map(|glyph| glyph == WALL_GLYPH));
        }

        let rows = u32::try_from(pattern.len()).map_err(|_| GridError::TooLarge {
            rows: u32::MAX,
            columns: 0,
        })?;
        let columns = u32::try_from(expected).map_err(|_| GridError::TooLarge {
            rows,
            columns: u32::MAX,
        })?;
        Self::new(rows, columns, tile_width, tile_height, occupied)
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// World width and height of a single tile.
    #[must_use]
    pub const fn tile_size(&self) -> Vec2 {
        self.tile_size
    }

    /// Converts a world offset into fractional row and column coordinates.
    #[must_use]
    pub fn offset_to_row_column(&self, offset: Vec2) -> (f32, f32) {
        (-offset.y / self.tile_size.y, offset.x / self.tile_size.x)
    }

    /// Slot that contains the provided world offset.
    ///
    /// The slot may lie outside the grid bounds.
    #[must_use]
    pub fn slot_for_offset(&self, offset: Vec2) -> SlotCoord {
        let (row, column) = self.offset_to_row_column(offset);
        SlotCoord::new(row.floor() as i32, column.floor() as i32)
    }

    /// World offset of a slot's centre, computed even outside the grid.
    #[must_use]
    pub fn row_column_to_offset(&self, slot: SlotCoord) -> Vec2 {
        Vec2::new(
            (slot.column() as f32 + 0.5) * self.tile_size.x,
            -(slot.row() as f32 + 0.5) * self.tile_size.y,
        )
    }

    /// World offset of a slot's centre, or `None` outside the grid.
    #[must_use]
    pub fn slot_center(&self, slot: SlotCoord) -> Option<Vec2> {
        self.contains(slot)
            .then(|| self.row_column_to_offset(slot))
    }

    /// World offset of the midpoint of a slot's left edge.
    ///
    /// Maze anchors that straddle two columns are expressed this way.
    #[must_use]
    pub fn left_edge_offset(&self, slot: SlotCoord) -> Vec2 {
        Vec2::new(
            slot.column() as f32 * self.tile_size.x,
            -(slot.row() as f32 + 0.5) * self.tile_size.y,
        )
    }

    /// Reports whether the slot lies within the grid bounds.
    #[must_use]
    pub fn contains(&self, slot: SlotCoord) -> bool {
        self.index(slot).is_some()
    }

    /// Occupancy of a slot, or `None` outside the grid.
    #[must_use]
    pub fn occupancy(&self, slot: SlotCoord) -> Option<bool> {
        self.index(slot)
            .and_then(|index| self.occupied.get(index).copied())
    }

    /// Reports whether the slot is blocked; slots outside the grid are open.
    #[must_use]
    pub fn is_occupied(&self, slot: SlotCoord) -> bool {
        self.occupancy(slot).unwrap_or(false)
    }

    /// Reports whether the slot, wrapped onto the grid, is blocked.
    #[must_use]
    pub fn is_occupied_wrapped(&self, slot: SlotCoord) -> bool {
        self.is_occupied(self.wrap_slot(slot))
    }

    /// Maps a slot outside the grid onto the opposite edge.
    #[must_use]
    pub fn wrap_slot(&self, slot: SlotCoord) -> SlotCoord {
        SlotCoord::new(
            slot.row().rem_euclid(self.rows as i32),
            slot.column().rem_euclid(self.columns as i32),
        )
    }

    /// Moves an offset whose slot lies outside the grid onto the opposite
    /// edge, keeping its position within the slot.
    #[must_use]
    pub fn wrap_offset(&self, offset: Vec2) -> Vec2 {
        let slot = self.slot_for_offset(offset);
        if self.contains(slot) {
            return offset;
        }
        let wrapped = self.wrap_slot(slot);
        let column_shift = (wrapped.column() - slot.column()) as f32;
        let row_shift = (wrapped.row() - slot.row()) as f32;
        Vec2::new(
            offset.x + column_shift * self.tile_size.x,
            offset.y - row_shift * self.tile_size.y,
        )
    }

    /// Row-major copy of the grid with [`WALL_CODE`] for blocked slots and
    /// [`OPEN_CODE`] for open ones.
    #[must_use]
    pub fn linear_occupancy(&self) -> Vec<u8> {
        self.occupied
            .iter()
            .map(|blocked| if *blocked { WALL_CODE } else { OPEN_CODE })
            .collect()
    }

    fn index(&self, slot: SlotCoord) -> Option<usize> {
        let row = u32::try_from(slot.row()).ok()?;
        let column = u32::try_from(slot.column()).ok()?;
        if row < self.rows && column < self.columns {
            let row = usize::try_from(row).ok()?;
            let column = usize::try_from(column).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> OccupancyGrid {
        OccupancyGrid::from_pattern(&["#####", "#...#", "....#", "#####"], 2.0, 1.0)
            .expect("valid pattern")
    }

    #[test]
    fn fractional_rows_grow_as_height_decreases() {
        let grid = grid();
        let (row, column) = grid.offset_to_row_column(Vec2::new(3.0, -2.25));
        assert_eq!((row, column), (2.25, 1.5));
        assert_eq!(
            grid.slot_for_offset(Vec2::new(3.0, -2.25)),
            SlotCoord::new(2, 1)
        );
    }

    #[test]
    fn slot_centres_round_trip_through_fractions() {
        let grid = grid();
        let slot = SlotCoord::new(1, 3);
        let centre = grid.row_column_to_offset(slot);
        assert_eq!(centre, Vec2::new(7.0, -1.5));
        assert_eq!(grid.offset_to_row_column(centre), (1.5, 3.5));
        assert_eq!(grid.slot_center(slot), Some(centre));
        assert_eq!(grid.slot_center(SlotCoord::new(4, 0)), None);
    }

    #[test]
    fn outside_slots_are_open_but_flagged_invalid() {
        let grid = grid();
        let outside = SlotCoord::new(2, -1);
        assert_eq!(grid.occupancy(outside), None);
        assert!(!grid.is_occupied(outside));
        assert!(grid.is_occupied_wrapped(outside));
        assert!(!grid.is_occupied_wrapped(SlotCoord::new(2, 5)));
    }

    #[test]
    fn negative_offsets_floor_instead_of_truncating() {
        let grid = grid();
        assert_eq!(
            grid.slot_for_offset(Vec2::new(-0.5, -2.5)),
            SlotCoord::new(2, -1)
        );
    }

    #[test]
    fn wrapping_preserves_the_position_within_the_slot() {
        let grid = grid();
        let wrapped = grid.wrap_offset(Vec2::new(-0.5, -2.5));
        assert_eq!(wrapped, Vec2::new(9.5, -2.5));
        assert_eq!(grid.slot_for_offset(wrapped), SlotCoord::new(2, 4));
        assert_eq!(grid.wrap_offset(Vec2::new(3.0, -1.5)), Vec2::new(3.0, -1.5));
    }

    #[test]
    fn linear_occupancy_marks_walls() {
        let grid = OccupancyGrid::from_pattern(&["#.", ".#"], 1.0, 1.0).expect("valid pattern");
        assert_eq!(
            grid.linear_occupancy(),
            vec![WALL_CODE, OPEN_CODE, OPEN_CODE, WALL_CODE]
        );
    }

    #[test]
    fn rejects_inconsistent_tables() {
        assert_eq!(
            OccupancyGrid::new(2, 2, 1.0, 1.0, vec![false; 3]),
            Err(GridError::CellCountMismatch {
                expected: 4,
                found: 3
            })
        );
        assert_eq!(
            OccupancyGrid::from_pattern(&["##", "#"], 1.0, 1.0),
            Err(GridError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            OccupancyGrid::new(1, 1, 0.0, 1.0, vec![false]),
            Err(GridError::InvalidTileSize)
        );
        let empty: [&str; 0] = [];
        assert_eq!(
            OccupancyGrid::from_pattern(&empty, 1.0, 1.0),
            Err(GridError::Empty)
        );
    }
}
