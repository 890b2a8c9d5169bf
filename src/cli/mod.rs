//! Terminal player

pub mod play;
pub mod terminal;

use crate::loader::StoryKind;
use std::path::PathBuf;

/// Arguments of the `play` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayArgs {
    pub game_dir: PathBuf,
    pub story: String,
    pub kind: StoryKind,
    pub autoplay: bool,
    pub debug: bool,
    pub save_dir: Option<PathBuf>,
}

impl PlayArgs {
    /// Parse the arguments following `play`
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let mut positional = Vec::new();
        let mut kind = StoryKind::Event;
        let mut autoplay = false;
        let mut debug = false;
        let mut save_dir = None;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--texting" => kind = StoryKind::Texting,
                "--autoplay" => autoplay = true,
                "--debug" => debug = true,
                "--save-dir" => match iter.next() {
                    Some(dir) => save_dir = Some(PathBuf::from(dir)),
                    None => return Err("--save-dir requires a directory".to_string()),
                },
                flag if flag.starts_with("--") => return Err(format!("Unknown option '{flag}'")),
                _ => positional.push(arg.clone()),
            }
        }

        match positional.as_slice() {
            [game_dir, story] => Ok(Self {
                game_dir: PathBuf::from(game_dir),
                story: story.clone(),
                kind,
                autoplay,
                debug,
                save_dir,
            }),
            [] | [_] => Err("Missing game directory or story name".to_string()),
            _ => Err("Too many arguments".to_string()),
        }
    }

    /// Save directory, `<game-dir>/save` unless given
    pub fn save_dir(&self) -> PathBuf {
        self.save_dir
            .clone()
            .unwrap_or_else(|| self.game_dir.join("save"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_flags_in_any_order() {
        let parsed =
            PlayArgs::parse(&args(&["--texting", "game", "--autoplay", "bea.json"])).unwrap();
        assert_eq!(parsed.game_dir, PathBuf::from("game"));
        assert_eq!(parsed.story, "bea.json");
        assert_eq!(parsed.kind, StoryKind::Texting);
        assert!(parsed.autoplay);
        assert!(!parsed.debug);
        assert_eq!(parsed.save_dir(), PathBuf::from("game").join("save"));
    }

    #[test]
    fn explicit_save_dir_wins() {
        let parsed =
            PlayArgs::parse(&args(&["game", "intro.json", "--save-dir", "/tmp/saves"])).unwrap();
        assert_eq!(parsed.kind, StoryKind::Event);
        assert_eq!(parsed.save_dir(), PathBuf::from("/tmp/saves"));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(PlayArgs::parse(&args(&["game"])).is_err());
        assert!(PlayArgs::parse(&args(&["game", "a.json", "b.json"])).is_err());
        assert!(PlayArgs::parse(&args(&["game", "a.json", "--save-dir"])).is_err());
        assert!(PlayArgs::parse(&args(&["game", "a.json", "--fast"])).is_err());
    }
}
