//! Console command parsing.
//!
//! One command per line. The first word selects the command; block
//! arguments are titles or hex ID prefixes (see
//! [`tabula_types::resolve_prefix`]). Free text always comes last and runs to
//! the end of the line, so titles may contain spaces.

use std::path::PathBuf;

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List boards, or the children of a block.
    List { target: Option<String> },
    NewBoard { title: String },
    NewCard { board: String, title: String },
    /// Append a text block to a card.
    AddText { card: String, text: String },
    Title { block: String, title: String },
    Icon { block: String, icon: String },
    Duplicate { card: String },
    Remove { block: String },
    Undo,
    Redo,
    History,
    Export { path: PathBuf },
    Save,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
commands:
  ls [block]                 list boards, or the children of a block
  board <title>              create a board
  card <board> <title>       create a card on a board
  text <card> <text>         append a text block to a card
  title <block> <title>      rename a block
  icon <block> <icon>        change a board or card icon
  dup <card>                 duplicate a card and its content
  rm <block>                 delete a block
  undo | redo                step through history
  history                    show what undo / redo would do
  export <path>              write an archive file
  save                       write the backing archive
  quit";

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = split_word(line);

        let cmd = match word {
            "ls" | "list" => Command::List {
                target: non_empty(rest).map(str::to_string),
            },
            "board" => Command::NewBoard {
                title: required(rest, "board <title>")?.to_string(),
            },
            "card" => {
                let (board, title) = two_args(rest, "card <board> <title>")?;
                Command::NewCard { board, title }
            }
            "text" => {
                let (card, text) = two_args(rest, "text <card> <text>")?;
                Command::AddText { card, text }
            }
            "title" => {
                let (block, title) = two_args(rest, "title <block> <title>")?;
                Command::Title { block, title }
            }
            "icon" => {
                let (block, icon) = two_args(rest, "icon <block> <icon>")?;
                Command::Icon { block, icon }
            }
            "dup" => Command::Duplicate {
                card: required(rest, "dup <card>")?.to_string(),
            },
            "rm" => Command::Remove {
                block: required(rest, "rm <block>")?.to_string(),
            },
            "undo" => Command::Undo,
            "redo" => Command::Redo,
            "history" => Command::History,
            "export" => Command::Export {
                path: PathBuf::from(required(rest, "export <path>")?),
            },
            "save" => Command::Save,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(ParseError::Unknown(other.to_string())),
        };
        Ok(Some(cmd))
    }
}

fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

fn required<'a>(s: &'a str, usage: &'static str) -> Result<&'a str, ParseError> {
    non_empty(s).ok_or(ParseError::Usage(usage))
}

/// A single-word block argument followed by free text.
fn two_args(s: &str, usage: &'static str) -> Result<(String, String), ParseError> {
    let (first, rest) = split_word(s.trim());
    match (non_empty(first), non_empty(rest)) {
        (Some(first), Some(rest)) => Ok((first.to_string(), rest.to_string())),
        _ => Err(ParseError::Usage(usage)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line() {
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn test_title_keeps_spaces() {
        let cmd = Command::parse("title 0193ab  Ship the  release ").unwrap();
        assert_eq!(
            cmd,
            Some(Command::Title {
                block: "0193ab".into(),
                title: "Ship the  release".into(),
            })
        );
    }

    #[test]
    fn test_list_with_and_without_target() {
        assert_eq!(Command::parse("ls").unwrap(), Some(Command::List { target: None }));
        assert_eq!(
            Command::parse("ls Roadmap").unwrap(),
            Some(Command::List { target: Some("Roadmap".into()) })
        );
    }

    #[test]
    fn test_missing_arguments() {
        assert_eq!(Command::parse("card Roadmap"), Err(ParseError::Usage("card <board> <title>")));
        assert_eq!(Command::parse("board"), Err(ParseError::Usage("board <title>")));
        assert_eq!(Command::parse("export "), Err(ParseError::Usage("export <path>")));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(Command::parse("frobnicate x"), Err(ParseError::Unknown("frobnicate".into())));
    }

    #[test]
    fn test_aliases() {
        assert_eq!(Command::parse("q").unwrap(), Some(Command::Quit));
        assert_eq!(Command::parse("?").unwrap(), Some(Command::Help));
        assert_eq!(Command::parse("list").unwrap(), Some(Command::List { target: None }));
    }
}
