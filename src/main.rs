//! CLI entry point for tokimeki
//!
//! Plays event scripts and texting chains from a game directory.

use std::process;
use tokimeki::cli::PlayArgs;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = &args[1];

    match command.as_str() {
        "play" => {
            let play_args = match PlayArgs::parse(&args[2..]) {
                Ok(play_args) => play_args,
                Err(message) => {
                    eprintln!("Error: {message}");
                    eprintln!();
                    print_usage();
                    process::exit(1);
                }
            };
            if let Err(err) = tokimeki::cli::play::run_play(play_args).await {
                eprintln!("Error: Player mode failed");
                eprintln!("Reason: {err:#}");
                process::exit(1);
            }
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Error: Unknown command '{}'", command);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("tokimeki - Branching story player");
    println!();
    println!("USAGE:");
    println!("    tokimeki play <game-dir> <story.json> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    play <game-dir> <story>    Play a story from the game directory");
    println!("    --help, -h                 Show this help message");
    println!();
    println!("OPTIONS:");
    println!("    --texting             Load from scripts/texting and play as a chat");
    println!("    --autoplay            Turn on autoplay (remembered in the save directory)");
    println!("    --debug               Trace the interpreter to stderr");
    println!("    --save-dir <dir>      Where progress is kept (default: <game-dir>/save)");
    println!();
    println!("ENVIRONMENT:");
    println!("    TOKIMEKI_DEBUG=1      Same as --debug");
    println!();
    println!("EXAMPLES:");
    println!("    tokimeki play game first_date.json");
    println!("    tokimeki play game alice_chat.json --texting --autoplay");
}
