use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;

use pisound::audio_engine::{MixerHandle, setup_logger, start_output};
use pisound::soundboard::constants::DEFAULT_VOLUME_PERCENT;
use pisound::soundboard::{
    ClipForm, DriveMode, EditorTarget, EngineConfig, EngineError, JsonFileStorage, Mode,
    Soundboard, TapOutcome,
};

type Board = Soundboard<JsonFileStorage, MixerHandle>;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    setup_logger();

    let project_dir: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let config = EngineConfig::for_project_dir(&project_dir).with_drive(DriveMode::Interactive);

    let (_output, mixer) = start_output().context("failed to open audio output")?;
    let mut board = Soundboard::open(config, mixer);
    let mut prompt = Prompt::new();

    let result = command_loop(&mut board, &mut prompt);
    board.shutdown();
    result
}

struct Prompt {
    lines: io::Lines<io::StdinLock<'static>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: io::stdin().lock().lines(),
        }
    }

    /// `None` once stdin is closed.
    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        print!("{question}");
        io::stdout().flush()?;
        self.lines.next().transpose()
    }
}

/// Prints engine errors for the user and carries on.
fn report<T>(result: Result<T, EngineError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(EngineError::NotFound { .. }) => {
            println!("No such sound exists...");
            None
        }
        Err(err) => {
            println!("{err}");
            None
        }
    }
}

fn command_loop(board: &mut Board, prompt: &mut Prompt) -> anyhow::Result<()> {
    loop {
        board.refresh();

        let question = match board.mode() {
            Mode::Play => {
                "Select sound to play (numeric), stop playing sound (S), enter Edit Mode (E), \
                 Add Sound (A), or Quit (Q): "
            }
            Mode::Edit => {
                "Select sound to edit (numeric), return to Play Mode (P), enter Trash Mode (T): "
            }
            Mode::Trash => {
                "Select sound to delete (numeric), return to Edit Mode (E), enter Play Mode (P): "
            }
        };
        let Some(line) = prompt.ask(question)? else {
            return Ok(());
        };
        let command = line.trim().to_uppercase();

        if let Ok(index) = command.parse::<usize>() {
            if let Some(outcome) = report(board.activate(index)) {
                follow_up(board, prompt, outcome)?;
            }
            continue;
        }

        match (board.mode(), command.as_str()) {
            (Mode::Play, "S") => {
                if !board.stop_playback() {
                    println!("Nothing is playing");
                }
            }
            (Mode::Play, "A") => {
                if report(board.open_creator(None)).is_some() {
                    run_editor(board, prompt)?;
                }
            }
            (Mode::Play, "Q") => {
                println!("See ya!");
                return Ok(());
            }
            (Mode::Play | Mode::Trash, "E") => {
                report(board.switch_mode(Mode::Edit));
            }
            (Mode::Edit | Mode::Trash, "P") => {
                report(board.switch_mode(Mode::Play));
            }
            (Mode::Edit, "T") => {
                report(board.switch_mode(Mode::Trash));
            }
            _ => println!("No valid command detected..."),
        }
    }
}

fn follow_up(board: &mut Board, prompt: &mut Prompt, outcome: TapOutcome) -> anyhow::Result<()> {
    match outcome {
        TapOutcome::EditorOpened { .. } => run_editor(board, prompt),
        TapOutcome::DeleteRequested { name, .. } => {
            let answer = prompt
                .ask(&format!("Are you sure you want to delete \"{name}\" [y/N]? "))?
                .unwrap_or_default();
            if answer.trim().eq_ignore_ascii_case("y") {
                report(board.confirm_delete());
            } else {
                board.cancel_delete();
                println!("{name} will not be deleted.");
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Collects the form, then loops on play / save / redo / discard until the editor closes.
fn run_editor(board: &mut Board, prompt: &mut Prompt) -> anyhow::Result<()> {
    loop {
        let creating = matches!(
            board.editor().map(|editor| editor.target()),
            Some(EditorTarget::Create { .. })
        );
        let Some(form) = read_form(prompt, creating)? else {
            board.discard_editor();
            return Ok(());
        };

        loop {
            let Some(choice) = prompt.ask(
                "Play Changes (P), Save (S), Redo Changes (R), or Discard Changes (D): ",
            )?
            else {
                board.discard_editor();
                return Ok(());
            };

            match choice.trim().to_uppercase().as_str() {
                "P" => {
                    report(board.test_play(&form));
                }
                "S" => {
                    if report(board.submit_editor(&form)).is_some() {
                        return Ok(());
                    }
                    break;
                }
                "R" => break,
                "D" => {
                    board.discard_editor();
                    println!("Changes discarded");
                    return Ok(());
                }
                _ => println!("No valid command detected..."),
            }
        }
    }
}

fn read_form(prompt: &mut Prompt, creating: bool) -> io::Result<Option<ClipForm>> {
    let default_volume = format!("default {DEFAULT_VOLUME_PERCENT}");
    let (sound_hint, name_hint, volume_hint, offset_hint) = if creating {
        ("", "", default_volume.as_str(), "default 0.0")
    } else {
        (
            " (leave blank for no change)",
            " (leave blank for no change)",
            "leave blank for no change",
            "leave blank for no change",
        )
    };

    let questions = [
        format!("Input sound filename{sound_hint}: "),
        format!("Input sound name{name_hint}: "),
        format!("Input sound volume (out of 100, {volume_hint}): "),
        format!("Input start time (seconds, {offset_hint}): "),
        format!("Input end time (seconds, {offset_hint}): "),
    ];

    let mut answers = Vec::with_capacity(questions.len());
    for question in &questions {
        match prompt.ask(question)? {
            Some(answer) => answers.push(answer),
            None => return Ok(None),
        }
    }

    let mut answers = answers.into_iter();
    let mut next = || answers.next().unwrap_or_default();
    Ok(Some(ClipForm {
        sound: next(),
        name: next(),
        volume: next(),
        start: next(),
        end: next(),
    }))
}
