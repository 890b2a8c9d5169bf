//! Interactive player mode
//!
//! Plays a story in the terminal. Enter advances, a number picks a choice.
//! With autoplay on, dialogue also advances by itself after its reading
//! delay unless a key is pressed first.

use crate::cli::PlayArgs;
use crate::cli::terminal::TerminalPresentation;
use crate::loader::{FileSystemSource, LoaderConfig, StoryKind};
use crate::resolve::BasicResolver;
use crate::runtime::{DebugConfig, DebugOutput, PlaybackMode, Wait};
use crate::session::{Session, SessionError};
use crate::storage::{AUTOPLAY_PREFERENCE, FileStore, LocalStorage};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

enum Command {
    Continue,
    Pick(usize),
    Quit,
}

/// Run the player mode
pub async fn run_play(args: PlayArgs) -> anyhow::Result<()> {
    let mut storage = LocalStorage::new(FileStore::new(args.save_dir()));
    if args.autoplay {
        storage.set_preference(AUTOPLAY_PREFERENCE, true)?;
    }

    let debug = if args.debug {
        DebugConfig {
            output: DebugOutput::Stderr,
            ..DebugConfig::enabled()
        }
    } else {
        DebugConfig::from_env()
    };

    let source = FileSystemSource::new(&args.game_dir);
    let mode = match args.kind {
        StoryKind::Event => PlaybackMode::Scene,
        StoryKind::Texting => PlaybackMode::Texting,
    };
    let presentation = TerminalPresentation::new(io::stdout(), mode);
    let story = args.story.clone();
    let mut session = Session::builder(presentation, Box::new(storage))
        .loader_config(LoaderConfig::default())
        .resolver(Box::new(BasicResolver::new(args.game_dir.display().to_string())))
        .debug(debug)
        .load(&source, args.kind, &args.story)
        .await?
        .on_finished(move || log::info!("Finished {story}"));

    clear_screen();
    println!("Controls:");
    println!("  Enter: next");
    println!("  1-9:   select choice");
    println!("  q:     quit");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut wait = settle(session.start())?;

    loop {
        match wait {
            Wait::Ended => {
                println!("=== The End ===");
                break;
            }
            Wait::Input => match next_command(&mut lines).await? {
                Command::Quit => break,
                _ => wait = settle(session.advance())?,
            },
            Wait::Timer { token, delay } => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        wait = settle(session.timer_elapsed(token))?;
                    }
                    command = next_command(&mut lines) => match command? {
                        Command::Quit => break,
                        _ => wait = settle(session.advance())?,
                    },
                }
            }
            Wait::Choice => {
                let count = session.interpreter().pending_choices().len();
                match next_command(&mut lines).await? {
                    Command::Quit => break,
                    Command::Pick(n) if (1..=count).contains(&n) => {
                        wait = settle(session.choose(n - 1))?;
                    }
                    _ => println!("Enter a number from 1 to {count}"),
                }
            }
        }
    }

    Ok(())
}

/// Rendering failures are reported and playback carries on
fn settle(result: Result<Wait, SessionError>) -> anyhow::Result<Wait> {
    match result {
        Ok(wait) => Ok(wait),
        Err(SessionError::Presentation { wait, failures }) => {
            for failure in failures {
                eprintln!("Warning: {failure}");
            }
            Ok(wait)
        }
        Err(err) => Err(err.into()),
    }
}

async fn next_command(lines: &mut Lines<BufReader<Stdin>>) -> anyhow::Result<Command> {
    let Some(line) = lines.next_line().await? else {
        return Ok(Command::Quit);
    };
    Ok(parse_command(&line))
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") {
        return Command::Quit;
    }
    match line.parse::<usize>() {
        Ok(n) => Command::Pick(n),
        Err(_) => Command::Continue,
    }
}

fn clear_screen() {
    let mut stdout = io::stdout();
    let _ = write!(stdout, "\x1b[2J\x1b[H");
    let _ = stdout.flush();
}
