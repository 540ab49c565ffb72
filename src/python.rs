//! Python binding used by the touchscreen GUI.

use std::path::Path;

use pyo3::exceptions::{PyIndexError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::audio_engine::{AudioOutput, MixerHandle, setup_logger, start_output};
use crate::soundboard::{
    ClipForm, DriveMode, EngineConfig, EngineError, JsonFileStorage, MenuCell, Mode, Slot,
    SlotCoord, Soundboard, TapOutcome,
};

fn to_py_err(err: EngineError) -> PyErr {
    match err {
        EngineError::NotFound { .. } => PyIndexError::new_err(err.to_string()),
        EngineError::Playback(_) | EngineError::Storage(_) => {
            PyRuntimeError::new_err(err.to_string())
        }
        _ => PyValueError::new_err(err.to_string()),
    }
}

fn parse_mode(name: &str) -> PyResult<Mode> {
    match name.to_ascii_lowercase().as_str() {
        "play" => Ok(Mode::Play),
        "edit" => Ok(Mode::Edit),
        "trash" => Ok(Mode::Trash),
        _ => Err(PyValueError::new_err(format!(
            "unknown mode {name:?} (expected play, edit or trash)"
        ))),
    }
}

/// Outcome of a tap as `(kind, index)`; `index` is set when the outcome concerns a stored clip.
fn outcome_tuple(outcome: TapOutcome) -> (&'static str, Option<usize>) {
    match outcome {
        TapOutcome::Started { index } => ("started", Some(index)),
        TapOutcome::Stopped { index } => ("stopped", Some(index)),
        TapOutcome::CreatorOpened { .. } => ("creator", None),
        TapOutcome::EditorOpened { index } => ("editor", Some(index)),
        TapOutcome::DeleteRequested { index, .. } => ("confirm_delete", Some(index)),
        TapOutcome::ModeChanged(_) => ("mode", None),
        TapOutcome::QuitRequested => ("quit", None),
        TapOutcome::Ignored => ("ignored", None),
    }
}

/// Soundboard engine driven by the GUI. Holds the audio output open for its lifetime.
#[pyclass(unsendable, name = "Soundboard")]
pub struct PySoundboard {
    engine: Soundboard<JsonFileStorage, MixerHandle>,
    _output: AudioOutput,
}

#[pymethods]
impl PySoundboard {
    /// Open the profile in `project_dir` and start audio output on the default device
    #[new]
    #[pyo3(signature = (project_dir = "."))]
    pub fn new(project_dir: &str) -> PyResult<Self> {
        setup_logger();

        let (output, mixer) = start_output()
            .map_err(|e| PyRuntimeError::new_err(format!("Failed to open audio output: {e}")))?;
        let config =
            EngineConfig::for_project_dir(Path::new(project_dir)).with_drive(DriveMode::Silent);

        Ok(Self {
            engine: Soundboard::open(config, mixer),
            _output: output,
        })
    }

    pub fn mode(&self) -> String {
        self.engine.mode().to_string()
    }

    pub fn switch_mode(&mut self, mode: &str) -> PyResult<()> {
        self.engine.switch_mode(parse_mode(mode)?).map_err(to_py_err)
    }

    pub fn grid_size(&self) -> (usize, usize) {
        let size = self.engine.grid().size();
        (size.rows, size.cols)
    }

    /// Label for the slot, `None` outside the grid
    pub fn label(&self, row: usize, col: usize) -> Option<String> {
        self.engine
            .label(SlotCoord::new(row, col))
            .map(str::to_string)
    }

    pub fn menu_label(&self, right: bool) -> &'static str {
        self.engine.menu_label(menu_cell(right))
    }

    pub fn tap(&mut self, row: usize, col: usize) -> PyResult<(&'static str, Option<usize>)> {
        self.engine
            .tap(Slot::Cell(SlotCoord::new(row, col)))
            .map(outcome_tuple)
            .map_err(to_py_err)
    }

    pub fn tap_menu(&mut self, right: bool) -> PyResult<(&'static str, Option<usize>)> {
        self.engine
            .tap(Slot::Menu(menu_cell(right)))
            .map(outcome_tuple)
            .map_err(to_py_err)
    }

    /// `(index, name)` of the clip awaiting delete confirmation
    pub fn pending_delete(&self) -> Option<(usize, String)> {
        self.engine
            .pending_delete()
            .map(|(index, entry)| (index, entry.display_name.clone()))
    }

    pub fn confirm_delete(&mut self) -> PyResult<()> {
        self.engine.confirm_delete().map(|_| ()).map_err(to_py_err)
    }

    pub fn cancel_delete(&mut self) -> bool {
        self.engine.cancel_delete()
    }

    /// Prefilled `(sound, name, volume, start, end)` of the open editor
    pub fn editor_fields(&self) -> Option<(String, String, String, String, String)> {
        self.engine.editor().map(|editor| {
            let form = editor.prefill().clone();
            (form.sound, form.name, form.volume, form.start, form.end)
        })
    }

    #[pyo3(signature = (sound = "", name = "", volume = "", start = "", end = ""))]
    pub fn submit_editor(
        &mut self,
        sound: &str,
        name: &str,
        volume: &str,
        start: &str,
        end: &str,
    ) -> PyResult<usize> {
        let form = form(sound, name, volume, start, end);
        self.engine.submit_editor(&form).map_err(to_py_err)
    }

    #[pyo3(signature = (sound = "", name = "", volume = "", start = "", end = ""))]
    pub fn test_play(
        &mut self,
        sound: &str,
        name: &str,
        volume: &str,
        start: &str,
        end: &str,
    ) -> PyResult<()> {
        let form = form(sound, name, volume, start, end);
        self.engine.test_play(&form).map_err(to_py_err)
    }

    pub fn discard_editor(&mut self) -> bool {
        self.engine.discard_editor()
    }

    pub fn stop(&mut self) -> bool {
        self.engine.stop_playback()
    }

    pub fn is_playing(&self, index: usize) -> bool {
        self.engine.is_clip_playing(index)
    }

    /// Seconds the current sound has been playing
    pub fn elapsed(&self) -> f64 {
        self.engine.elapsed()
    }

    /// Call periodically from the GUI loop; returns True when a sound finished by itself
    pub fn refresh(&mut self) -> bool {
        self.engine.refresh()
    }

    pub fn shutdown(&mut self) {
        self.engine.shutdown();
    }
}

fn menu_cell(right: bool) -> MenuCell {
    if right { MenuCell::Right } else { MenuCell::Left }
}

fn form(sound: &str, name: &str, volume: &str, start: &str, end: &str) -> ClipForm {
    ClipForm {
        sound: sound.to_string(),
        name: name.to_string(),
        volume: volume.to_string(),
        start: start.to_string(),
        end: end.to_string(),
    }
}
