//! Soundboard configuration constants and limits.

use std::time::Duration;

/// Rows of clip slots in the grid.
pub const GRID_ROWS: usize = 4;

/// Columns of clip slots in the grid.
pub const GRID_COLS: usize = 7;

/// Row/column value of a clip that has no grid cell.
pub const UNPLACED: i32 = -1;

/// Minimum clip volume (silence).
pub const VOLUME_MIN: f64 = 0.0;

/// Maximum clip volume (100%).
pub const VOLUME_MAX: f64 = 1.0;

/// Volume entered in forms is a percentage.
pub const VOLUME_PERCENT_MAX: f64 = 100.0;

/// Volume given to new clips when the form leaves it blank.
pub const DEFAULT_VOLUME_PERCENT: f64 = 25.0;

/// Refresh interval of the elapsed-time display.
pub const ELAPSED_TICK: Duration = Duration::from_millis(100);

/// Profile file name inside the project directory.
pub const PROFILE_FILE: &str = "profile.json";

/// Directory, relative to the project, holding the sound files.
pub const SOUNDS_DIR: &str = "sounds";

/// Label of an empty slot in Play mode.
pub const ADD_SOUND_LABEL: &str = "=Add Sound=";
