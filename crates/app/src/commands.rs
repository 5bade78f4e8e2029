use std::fmt;

use exam_core::model::{ChapterId, Difficulty, OptionId, SubjectId};

/// One line typed at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    Show,
    Resume,
    AddSubject { subject: SubjectId, declared: u32 },
    RemoveSubject(SubjectId),
    ToggleChapter { subject: SubjectId, chapter: ChapterId },
    AllChapters(SubjectId),
    NoChapters(SubjectId),
    Count(u32),
    Difficulty(Option<Difficulty>),
    TimeLimit(Option<u32>),
    Start,
    Retry,
    Pick(OptionId),
    Clear,
    Next,
    Prev,
    Goto(usize),
    Submit,
    Cancel,
    Finish,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    MissingArg { command: &'static str, arg: &'static str },
    InvalidArg { command: &'static str, raw: String },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => f.write_str("empty command"),
            CommandError::Unknown(word) => write!(f, "unknown command: {word} (try `help`)"),
            CommandError::MissingArg { command, arg } => write!(f, "{command} requires <{arg}>"),
            CommandError::InvalidArg { command, raw } => {
                write!(f, "invalid value for {command}: {raw}")
            }
        }
    }
}

impl std::error::Error for CommandError {}

fn arg<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    name: &'static str,
) -> Result<&'a str, CommandError> {
    words
        .next()
        .ok_or(CommandError::MissingArg { command, arg: name })
}

fn parsed<'a, T: std::str::FromStr>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    name: &'static str,
) -> Result<T, CommandError> {
    let raw = arg(words, command, name)?;
    raw.parse().map_err(|_| CommandError::InvalidArg {
        command,
        raw: raw.to_string(),
    })
}

/// `none`/`any` clear an optional setting.
fn optional<'a, T: std::str::FromStr>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    name: &'static str,
) -> Result<Option<T>, CommandError> {
    let raw = arg(words, command, name)?;
    if matches!(raw, "none" | "any" | "off") {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|_| CommandError::InvalidArg {
        command,
        raw: raw.to_string(),
    })
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandError::Empty);
        };
        let command = match head {
            "help" | "?" => Self::Help,
            "status" => Self::Status,
            "show" => Self::Show,
            "resume" => Self::Resume,
            "add" => Self::AddSubject {
                subject: parsed(&mut words, "add", "subject-id")?,
                declared: parsed(&mut words, "add", "question-count")?,
            },
            "remove" => Self::RemoveSubject(parsed(&mut words, "remove", "subject-id")?),
            "chapter" => Self::ToggleChapter {
                subject: parsed(&mut words, "chapter", "subject-id")?,
                chapter: parsed(&mut words, "chapter", "chapter-id")?,
            },
            "all" => Self::AllChapters(parsed(&mut words, "all", "subject-id")?),
            "nochapters" => Self::NoChapters(parsed(&mut words, "nochapters", "subject-id")?),
            "count" => Self::Count(parsed(&mut words, "count", "n")?),
            "difficulty" => Self::Difficulty(optional(&mut words, "difficulty", "level")?),
            "limit" => Self::TimeLimit(optional(&mut words, "limit", "minutes")?),
            "start" => Self::Start,
            "retry" => Self::Retry,
            "pick" => Self::Pick(parsed(&mut words, "pick", "option-id")?),
            "clear" => Self::Clear,
            "next" | "n" => Self::Next,
            "prev" | "p" => Self::Prev,
            "goto" => {
                let position: usize = parsed(&mut words, "goto", "number")?;
                let index = position.checked_sub(1).ok_or(CommandError::InvalidArg {
                    command: "goto",
                    raw: position.to_string(),
                })?;
                Self::Goto(index)
            }
            "submit" => Self::Submit,
            "cancel" => Self::Cancel,
            "finish" => Self::Finish,
            "quit" | "exit" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

pub fn print_help() {
    println!("Setup:");
    println!("  resume                              check the service for an attempt in progress");
    println!("  add <subject-id> <question-count>   add a subject (chapters loaded if available)");
    println!("  remove <subject-id>");
    println!("  chapter <subject-id> <chapter-id>   toggle a chapter");
    println!("  all <subject-id> | nochapters <subject-id>");
    println!("  count <n> | difficulty <easy|medium|hard|any> | limit <minutes|none>");
    println!("  start | retry");
    println!("Attempt:");
    println!("  show | status | next | prev | goto <n>");
    println!("  pick <option-id> | clear");
    println!("  submit | cancel | finish");
    println!("  quit");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_setup_commands() {
        assert_eq!(
            Command::parse("add 4 40").unwrap(),
            Command::AddSubject {
                subject: SubjectId::new(4),
                declared: 40
            }
        );
        assert_eq!(Command::parse("resume").unwrap(), Command::Resume);
        assert_eq!(
            Command::parse("  chapter 2 7 ").unwrap(),
            Command::ToggleChapter {
                subject: SubjectId::new(2),
                chapter: ChapterId::new(7)
            }
        );
        assert_eq!(
            Command::parse("difficulty Hard").unwrap(),
            Command::Difficulty(Some(Difficulty::Hard))
        );
        assert_eq!(
            Command::parse("limit none").unwrap(),
            Command::TimeLimit(None)
        );
        assert_eq!(
            Command::parse("limit 45").unwrap(),
            Command::TimeLimit(Some(45))
        );
    }

    #[test]
    fn goto_is_one_based() {
        assert_eq!(Command::parse("goto 1").unwrap(), Command::Goto(0));
        assert!(matches!(
            Command::parse("goto 0"),
            Err(CommandError::InvalidArg { command: "goto", .. })
        ));
    }

    #[test]
    fn reports_bad_input() {
        assert_eq!(Command::parse("   "), Err(CommandError::Empty));
        assert_eq!(
            Command::parse("dance"),
            Err(CommandError::Unknown("dance".into()))
        );
        assert_eq!(
            Command::parse("pick"),
            Err(CommandError::MissingArg {
                command: "pick",
                arg: "option-id"
            })
        );
        assert_eq!(
            Command::parse("add 4"),
            Err(CommandError::MissingArg {
                command: "add",
                arg: "question-count"
            })
        );
        assert!(matches!(
            Command::parse("count many"),
            Err(CommandError::InvalidArg { command: "count", .. })
        ));
    }
}
