//! Play / Edit / Trash mode state and per-mode slot dispatch.

use std::fmt;

use log::debug;

use crate::soundboard::clip::ClipId;
use crate::soundboard::errors::ModeError;
use crate::soundboard::grid::{Cell, SlotCoord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Play,
    Edit,
    Trash,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Play => "Play",
            Mode::Edit => "Edit",
            Mode::Trash => "Trash",
        };
        f.write_str(name)
    }
}

impl Mode {
    /// Trash is only reachable through Edit.
    pub fn can_switch_to(self, to: Mode) -> bool {
        !matches!((self, to), (Mode::Play, Mode::Trash))
    }

    /// What the two menu cells do in this mode.
    pub fn affordance(self, cell: MenuCell) -> MenuAffordance {
        match (self, cell) {
            (Mode::Play, MenuCell::Left) => MenuAffordance::SwitchTo(Mode::Edit),
            (Mode::Play, MenuCell::Right) => MenuAffordance::Quit,
            (Mode::Edit, MenuCell::Left) => MenuAffordance::SwitchTo(Mode::Play),
            (Mode::Edit, MenuCell::Right) => MenuAffordance::SwitchTo(Mode::Trash),
            (Mode::Trash, MenuCell::Left) => MenuAffordance::SwitchTo(Mode::Edit),
            (Mode::Trash, MenuCell::Right) => MenuAffordance::SwitchTo(Mode::Play),
        }
    }
}

/// The two menu slots outside the clip grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCell {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAffordance {
    SwitchTo(Mode),
    Quit,
}

impl MenuAffordance {
    pub fn label(self) -> &'static str {
        match self {
            MenuAffordance::SwitchTo(Mode::Play) => "Play Mode",
            MenuAffordance::SwitchTo(Mode::Edit) => "Edit Mode",
            MenuAffordance::SwitchTo(Mode::Trash) => "Trash Mode",
            MenuAffordance::Quit => "Quit",
        }
    }
}

#[derive(Debug, Default)]
pub struct ModeStateMachine {
    mode: Mode,
}

impl ModeStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Moves to `to`. Returns whether the mode actually changed.
    pub fn request(&mut self, to: Mode) -> Result<bool, ModeError> {
        if to == self.mode {
            return Ok(false);
        }
        if !self.mode.can_switch_to(to) {
            return Err(ModeError::IllegalTransition {
                from: self.mode,
                to,
            });
        }

        debug!("Mode {} -> {}", self.mode, to);
        self.mode = to;
        Ok(true)
    }
}

/// Effect of tapping a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAction {
    TogglePlayback { index: usize, id: ClipId },
    OpenCreator { coord: SlotCoord },
    OpenEditor { index: usize, id: ClipId },
    RequestDelete { index: usize, id: ClipId },
    Nothing,
}

/// Action for a tap on `cell` at `coord` in `mode`.
pub fn dispatch(mode: Mode, coord: SlotCoord, cell: &Cell) -> SlotAction {
    let action = match mode {
        Mode::Play => play_action(coord, cell),
        Mode::Edit => edit_action(cell),
        Mode::Trash => trash_action(cell),
    };
    debug!("{mode} tap at ({}, {}): {action:?}", coord.row, coord.col);
    action
}

/// Action for selecting a stored clip directly, without going through a grid cell.
pub fn clip_action(mode: Mode, index: usize, id: ClipId) -> SlotAction {
    let cell = Cell::Clip {
        index,
        id,
        label: String::new(),
    };
    match mode {
        // A bound cell never opens the creator, so the coordinate is unused.
        Mode::Play => play_action(SlotCoord::new(0, 0), &cell),
        Mode::Edit => edit_action(&cell),
        Mode::Trash => trash_action(&cell),
    }
}

fn play_action(coord: SlotCoord, cell: &Cell) -> SlotAction {
    match *cell {
        Cell::Clip { index, id, .. } => SlotAction::TogglePlayback { index, id },
        Cell::Empty => SlotAction::OpenCreator { coord },
    }
}

fn edit_action(cell: &Cell) -> SlotAction {
    match *cell {
        Cell::Clip { index, id, .. } => SlotAction::OpenEditor { index, id },
        Cell::Empty => SlotAction::Nothing,
    }
}

fn trash_action(cell: &Cell) -> SlotAction {
    match *cell {
        Cell::Clip { index, id, .. } => SlotAction::RequestDelete { index, id },
        Cell::Empty => SlotAction::Nothing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soundboard::clip::next_clip_id;

    #[test]
    fn test_play_to_trash_is_rejected() {
        let mut modes = ModeStateMachine::new();

        let err = modes.request(Mode::Trash).unwrap_err();

        assert_eq!(
            err,
            ModeError::IllegalTransition {
                from: Mode::Play,
                to: Mode::Trash
            }
        );
        assert_eq!(modes.mode(), Mode::Play);
    }

    #[test]
    fn test_legal_cycle() {
        let mut modes = ModeStateMachine::new();

        assert!(modes.request(Mode::Edit).unwrap());
        assert!(modes.request(Mode::Trash).unwrap());
        assert!(modes.request(Mode::Edit).unwrap());
        assert!(modes.request(Mode::Trash).unwrap());
        assert!(modes.request(Mode::Play).unwrap());
        assert_eq!(modes.mode(), Mode::Play);
    }

    #[test]
    fn test_same_mode_is_a_no_op() {
        let mut modes = ModeStateMachine::new();
        assert!(!modes.request(Mode::Play).unwrap());
    }

    #[test]
    fn test_dispatch_per_mode() {
        let id = next_clip_id();
        let clip = Cell::Clip {
            index: 2,
            id,
            label: "Boo".to_string(),
        };
        let coord = SlotCoord::new(1, 3);

        assert_eq!(
            dispatch(Mode::Play, coord, &clip),
            SlotAction::TogglePlayback { index: 2, id }
        );
        assert_eq!(
            dispatch(Mode::Edit, coord, &clip),
            SlotAction::OpenEditor { index: 2, id }
        );
        assert_eq!(
            dispatch(Mode::Trash, coord, &clip),
            SlotAction::RequestDelete { index: 2, id }
        );

        assert_eq!(
            dispatch(Mode::Play, coord, &Cell::Empty),
            SlotAction::OpenCreator { coord }
        );
        assert_eq!(dispatch(Mode::Edit, coord, &Cell::Empty), SlotAction::Nothing);
        assert_eq!(dispatch(Mode::Trash, coord, &Cell::Empty), SlotAction::Nothing);
    }

    #[test]
    fn test_clip_action_matches_cell_dispatch() {
        let id = next_clip_id();
        let cell = Cell::Clip {
            index: 4,
            id,
            label: "Boo".to_string(),
        };

        for mode in [Mode::Play, Mode::Edit, Mode::Trash] {
            assert_eq!(
                clip_action(mode, 4, id),
                dispatch(mode, SlotCoord::new(2, 2), &cell)
            );
        }
    }

    #[test]
    fn test_menu_labels() {
        assert_eq!(Mode::Edit.affordance(MenuCell::Left).label(), "Play Mode");
        assert_eq!(Mode::Play.affordance(MenuCell::Right).label(), "Quit");
    }
}
