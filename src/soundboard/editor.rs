//! The single in-progress create/edit form.

use crate::soundboard::clip::{ClipEntry, ClipForm, ClipId};
use crate::soundboard::grid::SlotCoord;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorTarget {
    /// New clip for an empty cell.
    Create { coord: SlotCoord },
    /// Existing clip, with the position it had when the editor opened.
    Edit { index: usize, id: ClipId },
}

#[derive(Clone, Debug)]
pub struct ClipEditor {
    target: EditorTarget,
    prefill: ClipForm,
}

impl ClipEditor {
    pub fn create(coord: SlotCoord) -> Self {
        Self {
            target: EditorTarget::Create { coord },
            prefill: ClipForm::default(),
        }
    }

    pub fn edit(index: usize, id: ClipId, entry: &ClipEntry) -> Self {
        Self {
            target: EditorTarget::Edit { index, id },
            prefill: ClipForm::from_entry(entry),
        }
    }

    pub fn target(&self) -> EditorTarget {
        self.target
    }

    /// Values the form opened with.
    pub fn prefill(&self) -> &ClipForm {
        &self.prefill
    }

    /// Blanks out every field of `form` still holding its prefilled value.
    pub fn changes(&self, form: &ClipForm) -> ClipForm {
        fn changed(value: &str, prefill: &str) -> String {
            if value.trim() == prefill.trim() {
                String::new()
            } else {
                value.to_string()
            }
        }

        ClipForm {
            sound: changed(&form.sound, &self.prefill.sound),
            name: changed(&form.name, &self.prefill.name),
            volume: changed(&form.volume, &self.prefill.volume),
            start: changed(&form.start, &self.prefill.start),
            end: changed(&form.end, &self.prefill.end),
        }
    }
}
