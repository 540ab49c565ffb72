//! Runtime configuration of the soundboard engine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::soundboard::constants::{ELAPSED_TICK, PROFILE_FILE, SOUNDS_DIR};
use crate::soundboard::grid::GridSize;

/// Who is driving the engine.
///
/// The command prompt wants echoes like "Now playing ..."; a GUI renders state itself and must not
/// get text on stdout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriveMode {
    Interactive,
    #[default]
    Silent,
}

impl DriveMode {
    pub fn is_interactive(self) -> bool {
        self == DriveMode::Interactive
    }
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Base directory that relative sound paths are resolved against.
    pub project_dir: PathBuf,
    /// Where the clip profile is persisted.
    pub profile_path: PathBuf,
    /// Directory, relative to `project_dir`, that form file names are placed under.
    pub sounds_dir: PathBuf,
    pub grid: GridSize,
    pub drive: DriveMode,
    /// Refresh interval of the elapsed-time display.
    pub tick_interval: Duration,
}

impl EngineConfig {
    /// `<dir>/profile.json` with sounds under `<dir>/sounds`.
    pub fn for_project_dir(dir: &Path) -> Self {
        Self {
            project_dir: dir.to_path_buf(),
            profile_path: dir.join(PROFILE_FILE),
            sounds_dir: PathBuf::from(SOUNDS_DIR),
            grid: GridSize::default(),
            drive: DriveMode::default(),
            tick_interval: ELAPSED_TICK,
        }
    }

    pub fn with_drive(mut self, drive: DriveMode) -> Self {
        self.drive = drive;
        self
    }

    /// Absolute location of a clip's `sound_path`.
    pub fn resolve_sound(&self, sound_path: &str) -> PathBuf {
        self.project_dir.join(sound_path)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_project_dir(Path::new("."))
    }
}
