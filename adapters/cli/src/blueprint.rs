//! Loader for maze blueprints written as rows of numeric codes.
//!
//! Values are separated by spaces, commas or tabs. Codes `1..=5` are wall
//! tiles, `6` and `7` place small and big pellets, `8` marks the player start
//! and `9` the slot in front of the enclosure door. `0` is an empty slot.

use maze_chase_core::{
    Enclosure, GridError, ItemKind, ItemSeed, LayoutError, OccupancyGrid, SlotCoord, StageLayout,
};

const TILE_FIRST: u8 = 1;
const TILE_LAST: u8 = 5;
const SMALL_PELLET: u8 = 6;
const BIG_PELLET: u8 = 7;
const PLAYER_START: u8 = 8;
const ENEMY_ENTRANCE: u8 = 9;

const SEPARATORS: [char; 3] = [' ', ',', '\t'];

/// Errors raised while reading a blueprint.
#[derive(Debug, PartialEq, thiserror::Error)]
pub(crate) enum BlueprintError {
    #[error("blueprint contains no rows")]
    Empty,
    #[error("row {row} holds {found} values but the first row holds {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("value `{value}` at row {row}, column {column} is not a blueprint code")]
    InvalidCode {
        row: usize,
        column: usize,
        value: String,
    },
    #[error("blueprint has no player start (code 8)")]
    MissingPlayerStart,
    #[error("blueprint has no enclosure entrance (code 9)")]
    MissingEntrance,
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Parses a blueprint into a stage layout with the provided tile dimensions.
///
/// When a marker appears more than once, the last occurrence wins.
pub(crate) fn parse(
    text: &str,
    tile_width: f32,
    tile_height: f32,
) -> Result<StageLayout, BlueprintError> {
    let rows: Vec<Vec<&str>> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.split(SEPARATORS)
                .filter(|value| !value.is_empty())
                .collect()
        })
        .collect();
    let expected = rows.first().map(Vec::len).ok_or(BlueprintError::Empty)?;

    let mut occupied = Vec::with_capacity(rows.len() * expected);
    let mut items = Vec::new();
    let mut player_start = None;
    let mut entrance = None;

    for (row, values) in rows.iter().enumerate() {
        if values.len() != expected {
            return Err(BlueprintError::RaggedRow {
                row,
                expected,
                found: values.len(),
            });
        }
        for (column, value) in values.iter().enumerate() {
            let code = value
                .parse::<u8>()
                .ok()
                .filter(|code| *code <= ENEMY_ENTRANCE)
                .ok_or_else(|| BlueprintError::InvalidCode {
                    row,
                    column,
                    value: (*value).to_owned(),
                })?;
            occupied.push((TILE_FIRST..=TILE_LAST).contains(&code));

            let slot = SlotCoord::new(row as i32, column as i32);
            match code {
                SMALL_PELLET => items.push(ItemSeed {
                    kind: ItemKind::SmallPellet,
                    slot,
                }),
                BIG_PELLET => items.push(ItemSeed {
                    kind: ItemKind::BigPellet,
                    slot,
                }),
                PLAYER_START => player_start = Some(slot),
                ENEMY_ENTRANCE => entrance = Some(slot),
                _ => {}
            }
        }
    }

    let grid = OccupancyGrid::new(
        rows.len() as u32,
        expected as u32,
        tile_width,
        tile_height,
        occupied,
    )?;
    let player_start = player_start.ok_or(BlueprintError::MissingPlayerStart)?;
    let entrance = entrance.ok_or(BlueprintError::MissingEntrance)?;
    let enclosure = Enclosure::below_entrance(&grid, entrance);
    let start = grid.left_edge_offset(player_start);

    Ok(StageLayout::new(grid, start, enclosure, items)?)
}
