//! Clip definitions: the persisted [`ClipEntry`], partial updates, and raw form input.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize};

use crate::soundboard::constants::{
    DEFAULT_VOLUME_PERCENT, UNPLACED, VOLUME_MAX, VOLUME_MIN, VOLUME_PERCENT_MAX,
};
use crate::soundboard::errors::{ClipField, ValidationError};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Process-local identity of a clip. Survives edits and deletes of other entries, never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClipId(u64);

pub fn next_clip_id() -> ClipId {
    ClipId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

fn unplaced() -> i32 {
    UNPLACED
}

fn default_volume() -> f64 {
    DEFAULT_VOLUME_PERCENT / VOLUME_PERCENT_MAX
}

/// Profiles written on Windows store paths like `sounds\horn.mp3`.
fn with_forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

fn deserialize_sound_path<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(with_forward_slashes(&raw))
}

/// One sound on the board.
///
/// The serialized keys match the profile files written by earlier PiSound builds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipEntry {
    /// Path of the audio file, relative to the project directory.
    #[serde(rename = "sound", deserialize_with = "deserialize_sound_path")]
    pub sound_path: String,

    /// Label shown on the slot.
    #[serde(rename = "text", default)]
    pub display_name: String,

    /// Playback gain, `0.0..=1.0`.
    #[serde(default = "default_volume")]
    pub volume: f64,

    /// Seek position in seconds when playback starts.
    #[serde(rename = "start", default)]
    pub start_offset: f64,

    /// Stop position in seconds; `0.0` plays to the natural end.
    #[serde(rename = "end", default)]
    pub end_offset: f64,

    #[serde(default = "unplaced")]
    pub row: i32,

    #[serde(default = "unplaced")]
    pub col: i32,
}

impl ClipEntry {
    /// An unplaced, untrimmed clip at the default volume.
    pub fn new(sound_path: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            sound_path: sound_path.into(),
            display_name: display_name.into(),
            volume: default_volume(),
            start_offset: 0.0,
            end_offset: 0.0,
            row: UNPLACED,
            col: UNPLACED,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_trim(mut self, start_offset: f64, end_offset: f64) -> Self {
        self.start_offset = start_offset;
        self.end_offset = end_offset;
        self
    }

    pub fn placed_at(mut self, row: i32, col: i32) -> Self {
        self.row = row;
        self.col = col;
        self
    }

    pub fn is_placed(&self) -> bool {
        self.row >= 0 && self.col >= 0
    }

    /// Seconds between start and end when the clip is trimmed at the end.
    pub fn trimmed_length(&self) -> Option<f64> {
        (self.end_offset > 0.0).then(|| self.end_offset - self.start_offset)
    }

    /// Checks the field constraints that do not need the audio file.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sound_path.trim().is_empty() {
            return Err(ValidationError::new(ClipField::SoundPath, "a sound file is required"));
        }

        if !self.volume.is_finite() || !(VOLUME_MIN..=VOLUME_MAX).contains(&self.volume) {
            return Err(ValidationError::new(
                ClipField::Volume,
                format!("{} is outside 0.0..=1.0", self.volume),
            ));
        }

        if !self.start_offset.is_finite() || self.start_offset < 0.0 {
            return Err(ValidationError::new(
                ClipField::StartOffset,
                "must be zero or a positive number of seconds",
            ));
        }

        if !self.end_offset.is_finite() || self.end_offset < 0.0 {
            return Err(ValidationError::new(
                ClipField::EndOffset,
                "must be zero or a positive number of seconds",
            ));
        }

        if self.end_offset > 0.0 && self.end_offset <= self.start_offset {
            return Err(ValidationError::new(
                ClipField::EndOffset,
                format!(
                    "{}s must be after the start offset {}s",
                    self.end_offset, self.start_offset
                ),
            ));
        }

        let both_unplaced = self.row == UNPLACED && self.col == UNPLACED;
        if !both_unplaced && !self.is_placed() {
            return Err(ValidationError::new(
                ClipField::Placement,
                format!("({}, {}) is neither a cell nor unplaced", self.row, self.col),
            ));
        }

        Ok(())
    }

    /// Checks the trim points against the length of the audio file.
    pub fn validate_against_duration(&self, duration: f64) -> Result<(), ValidationError> {
        if self.start_offset > duration {
            return Err(ValidationError::new(
                ClipField::StartOffset,
                format!("{}s is beyond the sound's {duration:.2}s", self.start_offset),
            ));
        }

        if self.end_offset > duration {
            return Err(ValidationError::new(
                ClipField::EndOffset,
                format!("{}s is beyond the sound's {duration:.2}s", self.end_offset),
            ));
        }

        Ok(())
    }
}

/// Fields to change on an existing entry; `None` keeps the current value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClipPatch {
    pub sound_path: Option<String>,
    pub display_name: Option<String>,
    pub volume: Option<f64>,
    pub start_offset: Option<f64>,
    pub end_offset: Option<f64>,
    pub row: Option<i32>,
    pub col: Option<i32>,
}

impl ClipPatch {
    pub fn is_empty(&self) -> bool {
        *self == ClipPatch::default()
    }

    /// Whether the patch changes which audio plays or how it is trimmed.
    pub fn touches_audio(&self) -> bool {
        self.sound_path.is_some() || self.start_offset.is_some() || self.end_offset.is_some()
    }

    /// Returns `entry` with every provided field replaced.
    pub fn applied_to(&self, entry: &ClipEntry) -> ClipEntry {
        ClipEntry {
            sound_path: self
                .sound_path
                .clone()
                .unwrap_or_else(|| entry.sound_path.clone()),
            display_name: self
                .display_name
                .clone()
                .unwrap_or_else(|| entry.display_name.clone()),
            volume: self.volume.unwrap_or(entry.volume),
            start_offset: self.start_offset.unwrap_or(entry.start_offset),
            end_offset: self.end_offset.unwrap_or(entry.end_offset),
            row: self.row.unwrap_or(entry.row),
            col: self.col.unwrap_or(entry.col),
        }
    }
}

/// Raw text of the create/edit form. Blank fields mean "no change" (edit) or "default" (create).
///
/// Volume is entered as a percentage, offsets in seconds, the sound as a file name inside the
/// sounds directory or as a project-relative path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClipForm {
    pub sound: String,
    pub name: String,
    pub volume: String,
    pub start: String,
    pub end: String,
}

impl ClipForm {
    /// Form pre-filled with an entry's current values.
    pub fn from_entry(entry: &ClipEntry) -> Self {
        Self {
            sound: entry.sound_path.clone(),
            name: entry.display_name.clone(),
            volume: format_percent(entry.volume),
            start: entry.start_offset.to_string(),
            end: entry.end_offset.to_string(),
        }
    }

    /// Parses the non-blank fields into a patch.
    pub fn to_patch(&self, sounds_dir: &Path) -> Result<ClipPatch, ValidationError> {
        Ok(ClipPatch {
            sound_path: non_blank(&self.sound).map(|s| sound_path_for(sounds_dir, s)),
            display_name: non_blank(&self.name).map(str::to_string),
            volume: parse_percent(&self.volume)?,
            start_offset: parse_seconds(ClipField::StartOffset, &self.start)?,
            end_offset: parse_seconds(ClipField::EndOffset, &self.end)?,
            row: None,
            col: None,
        })
    }

    /// Builds a new entry for `(row, col)`, filling blanks with defaults.
    ///
    /// A blank name falls back to the sound's file stem.
    pub fn to_entry(
        &self,
        sounds_dir: &Path,
        row: i32,
        col: i32,
    ) -> Result<ClipEntry, ValidationError> {
        let sound = non_blank(&self.sound)
            .ok_or_else(|| ValidationError::new(ClipField::SoundPath, "a sound file is required"))?;
        let sound_path = sound_path_for(sounds_dir, sound);

        let display_name = match non_blank(&self.name) {
            Some(name) => name.to_string(),
            None => Path::new(sound)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| sound.to_string()),
        };

        let entry = ClipEntry {
            sound_path,
            display_name,
            volume: parse_percent(&self.volume)?.unwrap_or_else(default_volume),
            start_offset: parse_seconds(ClipField::StartOffset, &self.start)?.unwrap_or(0.0),
            end_offset: parse_seconds(ClipField::EndOffset, &self.end)?.unwrap_or(0.0),
            row,
            col,
        };
        entry.validate()?;
        Ok(entry)
    }
}

fn non_blank(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_percent(text: &str) -> Result<Option<f64>, ValidationError> {
    let Some(text) = non_blank(text) else {
        return Ok(None);
    };

    let percent: f64 = text.parse().map_err(|_| {
        ValidationError::new(ClipField::Volume, format!("\"{text}\" is not a number"))
    })?;
    if !percent.is_finite() || !(0.0..=VOLUME_PERCENT_MAX).contains(&percent) {
        return Err(ValidationError::new(
            ClipField::Volume,
            format!("{percent} is outside 0..=100 percent"),
        ));
    }

    Ok(Some(percent / VOLUME_PERCENT_MAX))
}

fn parse_seconds(field: ClipField, text: &str) -> Result<Option<f64>, ValidationError> {
    let Some(text) = non_blank(text) else {
        return Ok(None);
    };

    let seconds: f64 = text
        .parse()
        .map_err(|_| ValidationError::new(field, format!("\"{text}\" is not a number")))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ValidationError::new(
            field,
            "must be zero or a positive number of seconds",
        ));
    }

    Ok(Some(seconds))
}

fn format_percent(volume: f64) -> String {
    let percent = volume * VOLUME_PERCENT_MAX;
    if (percent - percent.round()).abs() < 1e-9 {
        format!("{}", percent.round())
    } else {
        format!("{percent}")
    }
}

/// Bare file names are placed under the sounds directory; paths are taken as given.
fn sound_path_for(sounds_dir: &Path, input: &str) -> String {
    let input = with_forward_slashes(input);
    let path = Path::new(&input);
    if path.is_absolute() || path.components().count() > 1 {
        return input;
    }
    sounds_dir.join(path).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn air_horn() -> ClipEntry {
        ClipEntry::new("a.mp3", "Air Horn")
            .with_volume(0.5)
            .with_trim(0.0, 2.0)
            .placed_at(0, 0)
    }

    #[test]
    fn test_valid_entry_passes() {
        assert!(air_horn().validate().is_ok());
        assert!(ClipEntry::new("a.mp3", "").validate().is_ok());
    }

    #[test]
    fn test_validation_names_offending_field() {
        let cases = [
            (ClipEntry::new("  ", "x"), ClipField::SoundPath),
            (air_horn().with_volume(1.5), ClipField::Volume),
            (air_horn().with_volume(f64::NAN), ClipField::Volume),
            (air_horn().with_trim(-1.0, 0.0), ClipField::StartOffset),
            (air_horn().with_trim(0.0, -2.0), ClipField::EndOffset),
            (air_horn().with_trim(3.0, 2.0), ClipField::EndOffset),
            (air_horn().with_trim(2.0, 2.0), ClipField::EndOffset),
            (air_horn().placed_at(0, -1), ClipField::Placement),
        ];

        for (entry, field) in cases {
            let err = entry.validate().unwrap_err();
            assert_eq!(err.field, field, "{entry:?}");
        }
    }

    #[test]
    fn test_zero_end_means_untrimmed() {
        let entry = air_horn().with_trim(1.5, 0.0);
        assert!(entry.validate().is_ok());
        assert_eq!(entry.trimmed_length(), None);
        assert_eq!(air_horn().with_trim(0.5, 2.0).trimmed_length(), Some(1.5));
    }

    #[test]
    fn test_validate_against_duration() {
        assert!(air_horn().validate_against_duration(2.0).is_ok());

        let err = air_horn().validate_against_duration(1.0).unwrap_err();
        assert_eq!(err.field, ClipField::EndOffset);

        let err = air_horn()
            .with_trim(5.0, 0.0)
            .validate_against_duration(1.0)
            .unwrap_err();
        assert_eq!(err.field, ClipField::StartOffset);
    }

    #[test]
    fn test_blank_form_fields_leave_entry_unchanged() {
        let form = ClipForm {
            volume: "30".to_string(),
            ..ClipForm::default()
        };

        let patch = form.to_patch(Path::new("sounds")).unwrap();
        let edited = patch.applied_to(&air_horn());

        assert_eq!(edited.volume, 0.30);
        assert_eq!(
            ClipEntry {
                volume: 0.5,
                ..edited
            },
            air_horn()
        );
    }

    #[test]
    fn test_form_rejects_bad_numbers() {
        let sounds = Path::new("sounds");

        let err = ClipForm {
            volume: "loud".to_string(),
            ..ClipForm::default()
        }
        .to_patch(sounds)
        .unwrap_err();
        assert_eq!(err.field, ClipField::Volume);

        let err = ClipForm {
            volume: "101".to_string(),
            ..ClipForm::default()
        }
        .to_patch(sounds)
        .unwrap_err();
        assert_eq!(err.field, ClipField::Volume);

        let err = ClipForm {
            end: "-3".to_string(),
            ..ClipForm::default()
        }
        .to_patch(sounds)
        .unwrap_err();
        assert_eq!(err.field, ClipField::EndOffset);
    }

    #[test]
    fn test_new_entry_from_form_uses_defaults() {
        let form = ClipForm {
            sound: "horn.wav".to_string(),
            ..ClipForm::default()
        };

        let entry = form.to_entry(Path::new("sounds"), 1, 2).unwrap();

        assert_eq!(entry.sound_path, "sounds/horn.wav");
        assert_eq!(entry.display_name, "horn");
        assert_eq!(entry.volume, 0.25);
        assert_eq!((entry.start_offset, entry.end_offset), (0.0, 0.0));
        assert_eq!((entry.row, entry.col), (1, 2));
    }

    #[test]
    fn test_new_entry_requires_sound() {
        let err = ClipForm {
            name: "Nothing".to_string(),
            ..ClipForm::default()
        }
        .to_entry(Path::new("sounds"), 0, 0)
        .unwrap_err();

        assert_eq!(err.field, ClipField::SoundPath);
    }

    #[test]
    fn test_new_entry_checks_trim_order() {
        let form = ClipForm {
            sound: "horn.wav".to_string(),
            start: "3".to_string(),
            end: "1".to_string(),
            ..ClipForm::default()
        };

        let err = form.to_entry(Path::new("sounds"), 0, 0).unwrap_err();
        assert_eq!(err.field, ClipField::EndOffset);
    }

    #[test]
    fn test_paths_with_directories_are_kept() {
        let form = ClipForm {
            sound: "sounds/horn.wav".to_string(),
            ..ClipForm::default()
        };
        let patch = form.to_patch(Path::new("sounds")).unwrap();

        assert_eq!(patch.sound_path.as_deref(), Some("sounds/horn.wav"));

        let form = ClipForm {
            sound: "sounds\\horn.wav".to_string(),
            ..ClipForm::default()
        };
        let patch = form.to_patch(Path::new("sounds")).unwrap();

        assert_eq!(patch.sound_path.as_deref(), Some("sounds/horn.wav"));
    }

    #[test]
    fn test_prefilled_form_round_trips() {
        let entry = air_horn().with_volume(0.3);
        let form = ClipForm::from_entry(&entry);

        assert_eq!(form.volume, "30");
        assert_eq!(form.end, "2");

        let patch = form.to_patch(Path::new("sounds")).unwrap();
        assert_eq!(patch.applied_to(&entry).volume, entry.volume);
    }

    #[test]
    fn test_persisted_keys_match_profile_format() {
        let json = serde_json::to_value(air_horn()).unwrap();

        assert_eq!(json["sound"], "a.mp3");
        assert_eq!(json["text"], "Air Horn");
        assert_eq!(json["volume"], 0.5);
        assert_eq!(json["start"], 0.0);
        assert_eq!(json["end"], 2.0);
        assert_eq!(json["row"], 0);
        assert_eq!(json["col"], 0);
    }

    #[test]
    fn test_legacy_records_load_with_defaults() {
        let entry: ClipEntry =
            serde_json::from_str(r#"{"sound": "sounds\\x.mp3", "text": "X", "volume": 0.4, "img": "imgs/x.png"}"#)
                .unwrap();

        assert_eq!(entry.sound_path, "sounds/x.mp3");
        assert_eq!(entry.volume, 0.4);
        assert_eq!((entry.row, entry.col), (UNPLACED, UNPLACED));
        assert_eq!(entry.end_offset, 0.0);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(next_clip_id(), next_clip_id());
    }
}
