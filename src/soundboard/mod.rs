//! Soundboard Engine Module
//!
//! The [`Soundboard`] owns everything a front end talks to:
//!
//! - [`clip_store`]: the persisted clip list
//! - [`playback`]: the single playback session and its auto-stop
//! - [`mode`]: Play / Edit / Trash state and per-mode dispatch
//! - [`grid`]: the slot grid rebuilt from the store after every change
//! - [`editor`]: the in-progress create/edit form
//!
//! Every mutation happens on the owner's thread. Positions are looked up again from each clip's
//! [`ClipId`] before use, so a stale position from an old grid is reported instead of hitting the
//! wrong clip.

use std::fmt::Display;

use log::{debug, info};

pub mod clip;
pub mod clip_store;
pub mod config;
pub mod constants;
pub mod editor;
pub mod errors;
pub mod grid;
pub mod mode;
pub mod playback;
pub mod schedule;

#[cfg(test)]
pub(crate) mod test_support;

pub use clip::{ClipEntry, ClipForm, ClipId, ClipPatch};
pub use clip_store::{ClipStorage, ClipStore, JsonFileStorage, MemoryStorage};
pub use config::{DriveMode, EngineConfig};
pub use editor::{ClipEditor, EditorTarget};
pub use errors::{EngineError, ValidationError};
pub use grid::{Cell, GridMap, GridSize, Slot, SlotCoord};
pub use mode::{MenuAffordance, MenuCell, Mode};
pub use playback::{SessionHandle, SessionSource};

use crate::audio_engine::AudioBackend;
use crate::soundboard::constants::UNPLACED;
use crate::soundboard::errors::ClipField;
use crate::soundboard::grid::GridBinder;
use crate::soundboard::mode::{ModeStateMachine, SlotAction};
use crate::soundboard::playback::PlaybackController;

/// What a tap or selection did, for the front end to react to.
#[derive(Clone, Debug, PartialEq)]
pub enum TapOutcome {
    Started { index: usize },
    Stopped { index: usize },
    CreatorOpened { coord: SlotCoord },
    EditorOpened { index: usize },
    /// Waiting for [`Soundboard::confirm_delete`] or [`Soundboard::cancel_delete`].
    DeleteRequested { index: usize, name: String },
    ModeChanged(Mode),
    QuitRequested,
    Ignored,
}

pub struct Soundboard<S: ClipStorage, B: AudioBackend + 'static> {
    config: EngineConfig,
    store: ClipStore<S>,
    playback: PlaybackController<B>,
    modes: ModeStateMachine,
    grid: GridMap,
    editor: Option<ClipEditor>,
    pending_delete: Option<(usize, ClipId)>,
}

impl<B: AudioBackend + 'static> Soundboard<JsonFileStorage, B> {
    /// Opens the profile file named by `config`.
    pub fn open(config: EngineConfig, backend: B) -> Self {
        let storage = JsonFileStorage::new(&config.profile_path);
        Self::new(config, storage, backend)
    }
}

impl<S: ClipStorage, B: AudioBackend + 'static> Soundboard<S, B> {
    pub fn new(config: EngineConfig, storage: S, backend: B) -> Self {
        let store = ClipStore::load(storage, config.grid);
        let playback = PlaybackController::new(backend, config.tick_interval);
        let modes = ModeStateMachine::new();
        let grid = GridBinder::bind(store.entries(), store.ids(), modes.mode(), config.grid);

        Self {
            config,
            store,
            playback,
            modes,
            grid,
            editor: None,
            pending_delete: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    pub fn label(&self, coord: SlotCoord) -> Option<&str> {
        self.grid.label(coord)
    }

    pub fn menu_label(&self, cell: MenuCell) -> &'static str {
        self.grid.menu(cell).label()
    }

    pub fn clips(&self) -> &[ClipEntry] {
        self.store.entries()
    }

    pub fn clip(&self, index: usize) -> Result<&ClipEntry, EngineError> {
        Ok(self.store.get(index)?)
    }

    pub fn editor(&self) -> Option<&ClipEditor> {
        self.editor.as_ref()
    }

    /// The clip awaiting delete confirmation, at its current position.
    pub fn pending_delete(&self) -> Option<(usize, &ClipEntry)> {
        let (_, id) = self.pending_delete?;
        let index = self.store.index_of(id)?;
        Some((index, &self.store.entries()[index]))
    }

    /// The live session, if any.
    pub fn session(&self) -> Option<&SessionHandle> {
        self.playback.current()
    }

    pub fn is_clip_playing(&self, index: usize) -> bool {
        self.store
            .id_at(index)
            .is_some_and(|id| self.playback.is_sounding(SessionSource::Clip(id)))
    }

    /// Seconds the current session has been playing.
    pub fn elapsed(&self) -> f64 {
        self.playback.elapsed().seconds()
    }

    /// Changes mode, dropping the open editor and any pending delete. Playback continues.
    pub fn switch_mode(&mut self, to: Mode) -> Result<(), EngineError> {
        if !self.modes.request(to)? {
            return Ok(());
        }

        if self.editor.take().is_some() {
            debug!("Discarded open editor on mode change");
        }
        self.pending_delete = None;
        self.rebind();
        self.echo(format_args!("{to} mode"));
        Ok(())
    }

    /// Handles a tap on a grid cell or menu cell.
    pub fn tap(&mut self, slot: Slot) -> Result<TapOutcome, EngineError> {
        match slot {
            Slot::Menu(cell) => match self.grid.menu(cell) {
                MenuAffordance::SwitchTo(mode) => {
                    self.switch_mode(mode)?;
                    Ok(TapOutcome::ModeChanged(mode))
                }
                MenuAffordance::Quit => Ok(TapOutcome::QuitRequested),
            },
            Slot::Cell(coord) => {
                let Some(cell) = self.grid.resolve(coord) else {
                    return Ok(TapOutcome::Ignored);
                };
                let action = mode::dispatch(self.modes.mode(), coord, cell);
                self.perform(action)
            }
        }
    }

    /// Selects the clip at `index` as if its slot was tapped. Works for unplaced clips too.
    pub fn activate(&mut self, index: usize) -> Result<TapOutcome, EngineError> {
        let id = self.store.id_at(index).ok_or(EngineError::NotFound {
            index,
            len: self.store.len(),
        })?;
        self.perform(mode::clip_action(self.modes.mode(), index, id))
    }

    /// Opens the creator for `coord`, or for the first empty cell.
    pub fn open_creator(&mut self, coord: Option<SlotCoord>) -> Result<SlotCoord, EngineError> {
        let coord = match coord {
            Some(coord) => coord,
            None => self.grid.first_empty().ok_or_else(|| {
                ValidationError::new(ClipField::Placement, "every slot is already taken")
            })?,
        };

        match self.grid.resolve(coord) {
            Some(Cell::Empty) => {}
            Some(Cell::Clip { label, .. }) => {
                return Err(ValidationError::new(
                    ClipField::Placement,
                    format!("({}, {}) already holds \"{label}\"", coord.row, coord.col),
                )
                .into());
            }
            None => {
                return Err(ValidationError::new(
                    ClipField::Placement,
                    format!("({}, {}) is outside the grid", coord.row, coord.col),
                )
                .into());
            }
        }

        self.editor = Some(ClipEditor::create(coord));
        Ok(coord)
    }

    /// Saves the open editor's form. The editor stays open when saving fails.
    pub fn submit_editor(&mut self, form: &ClipForm) -> Result<usize, EngineError> {
        let editor = self.editor.as_ref().ok_or(EngineError::NoEditor)?;

        let index = match editor.target() {
            EditorTarget::Create { coord } => {
                let entry = form.to_entry(
                    &self.config.sounds_dir,
                    coord.row as i32,
                    coord.col as i32,
                )?;
                self.add_clip(entry)?
            }
            EditorTarget::Edit { index, id } => {
                let patch = editor.changes(form).to_patch(&self.config.sounds_dir)?;
                let index = self.resolve(index, id)?;
                self.edit_clip(index, &patch)?;
                index
            }
        };

        self.editor = None;
        Ok(index)
    }

    pub fn discard_editor(&mut self) -> bool {
        self.editor.take().is_some()
    }

    /// Plays the open editor's form without saving it.
    pub fn test_play(&mut self, form: &ClipForm) -> Result<(), EngineError> {
        let editor = self.editor.as_ref().ok_or(EngineError::NoEditor)?;

        let entry = match editor.target() {
            EditorTarget::Create { .. } => {
                form.to_entry(&self.config.sounds_dir, UNPLACED, UNPLACED)?
            }
            EditorTarget::Edit { index, id } => {
                let patch = editor.changes(form).to_patch(&self.config.sounds_dir)?;
                let index = self.resolve(index, id)?;
                let entry = patch
                    .applied_to(self.store.get(index)?)
                    .placed_at(UNPLACED, UNPLACED);
                entry.validate()?;
                entry
            }
        };

        let path = self.config.resolve_sound(&entry.sound_path);
        self.playback.play(&entry, &path, SessionSource::Preview)?;
        self.echo(format_args!("Testing {}...", entry.display_name));
        Ok(())
    }

    /// Deletes the clip awaiting confirmation.
    pub fn confirm_delete(&mut self) -> Result<ClipEntry, EngineError> {
        let (index, id) = self
            .pending_delete
            .take()
            .ok_or(EngineError::NothingToConfirm)?;
        let index = self.resolve(index, id)?;
        self.delete_clip(index)
    }

    pub fn cancel_delete(&mut self) -> bool {
        self.pending_delete.take().is_some()
    }

    /// Validates and stores a new clip. Trimmed clips are checked against the file's length.
    pub fn add_clip(&mut self, entry: ClipEntry) -> Result<usize, EngineError> {
        entry.validate()?;
        self.check_against_audio(&entry)?;

        let name = entry.display_name.clone();
        let (index, _) = self.store.add(entry)?;
        self.rebind();
        self.echo(format_args!("Saved {name}"));
        Ok(index)
    }

    /// Applies `patch` to the clip at `index`. Rejected while that clip is sounding.
    pub fn edit_clip(&mut self, index: usize, patch: &ClipPatch) -> Result<ClipEntry, EngineError> {
        let current = self.store.get(index)?;
        if patch.is_empty() {
            return Ok(current.clone());
        }

        self.playback.reap_finished();
        if self.is_clip_playing(index) {
            return Err(EngineError::ClipSounding {
                name: self.store.get(index)?.display_name.clone(),
            });
        }

        let merged = patch.applied_to(self.store.get(index)?);
        if patch.touches_audio() {
            merged.validate()?;
            self.check_against_audio(&merged)?;
        }

        let edited = self.store.edit(index, patch)?.clone();
        self.rebind();
        self.echo(format_args!("Saved {}", edited.display_name));
        Ok(edited)
    }

    /// Removes the clip at `index`, stopping it first when it is sounding.
    pub fn delete_clip(&mut self, index: usize) -> Result<ClipEntry, EngineError> {
        let id = self.store.id_at(index).ok_or(EngineError::NotFound {
            index,
            len: self.store.len(),
        })?;

        if self.playback.is_sounding(SessionSource::Clip(id)) {
            self.playback.stop_current();
        }

        let removed = self.store.delete(index)?;
        if self.pending_delete.is_some_and(|(_, pending)| pending == id) {
            self.pending_delete = None;
        }
        if self
            .editor
            .as_ref()
            .is_some_and(|editor| matches!(editor.target(), EditorTarget::Edit { id: open, .. } if open == id))
        {
            self.editor = None;
        }

        self.rebind();
        self.echo(format_args!("Deleted {}", removed.display_name));
        Ok(removed)
    }

    /// Stops whatever is playing.
    pub fn stop_playback(&mut self) -> bool {
        let stopped = self.playback.stop_current();
        if stopped {
            self.echo("Stopped");
        }
        stopped
    }

    /// Closes a session that ended on its own and rebuilds the grid. Returns whether one ended.
    pub fn refresh(&mut self) -> bool {
        let ended = self.playback.reap_finished().is_some();
        self.rebind();
        ended
    }

    /// Stops playback and drops transient state. Call before exiting.
    pub fn shutdown(&mut self) {
        self.editor = None;
        self.pending_delete = None;
        self.playback.stop_current();
        info!("Soundboard shut down");
    }

    fn perform(&mut self, action: SlotAction) -> Result<TapOutcome, EngineError> {
        match action {
            SlotAction::TogglePlayback { index, id } => self.toggle(index, id),
            SlotAction::OpenCreator { coord } => {
                self.editor = Some(ClipEditor::create(coord));
                Ok(TapOutcome::CreatorOpened { coord })
            }
            SlotAction::OpenEditor { index, id } => {
                let index = self.resolve(index, id)?;
                self.editor = Some(ClipEditor::edit(index, id, self.store.get(index)?));
                Ok(TapOutcome::EditorOpened { index })
            }
            SlotAction::RequestDelete { index, id } => {
                let index = self.resolve(index, id)?;
                let name = self.store.get(index)?.display_name.clone();
                self.pending_delete = Some((index, id));
                Ok(TapOutcome::DeleteRequested { index, name })
            }
            SlotAction::Nothing => Ok(TapOutcome::Ignored),
        }
    }

    fn toggle(&mut self, index: usize, id: ClipId) -> Result<TapOutcome, EngineError> {
        let index = self.resolve(index, id)?;
        self.playback.reap_finished();

        if self.playback.is_sounding(SessionSource::Clip(id)) {
            self.playback.stop_current();
            self.echo("Stopped");
            return Ok(TapOutcome::Stopped { index });
        }

        let entry = self.store.get(index)?.clone();
        let path = self.config.resolve_sound(&entry.sound_path);
        self.playback.play(&entry, &path, SessionSource::Clip(id))?;
        self.echo(format_args!("Now playing {}...", entry.display_name));
        Ok(TapOutcome::Started { index })
    }

    /// Current position of `id`, which was at `index` when the caller looked.
    fn resolve(&mut self, index: usize, id: ClipId) -> Result<usize, EngineError> {
        if self.store.id_at(index) == Some(id) {
            return Ok(index);
        }
        if let Some(current) = self.store.index_of(id) {
            return Ok(current);
        }

        self.rebind();
        Err(EngineError::NotFound {
            index,
            len: self.store.len(),
        })
    }

    fn check_against_audio(&self, entry: &ClipEntry) -> Result<(), EngineError> {
        if entry.start_offset == 0.0 && entry.end_offset == 0.0 {
            return Ok(());
        }
        let path = self.config.resolve_sound(&entry.sound_path);
        let duration = self.playback.duration_of(&path)?;
        entry.validate_against_duration(duration)?;
        Ok(())
    }

    fn rebind(&mut self) {
        self.grid = GridBinder::bind(
            self.store.entries(),
            self.store.ids(),
            self.modes.mode(),
            self.config.grid,
        );
    }

    fn echo(&self, message: impl Display) {
        if self.config.drive.is_interactive() {
            println!("{message}");
        }
    }
}
