use crate::error::CommandError;
use crate::filter::FilterState;
use std::str::FromStr;

/// One line typed at the dashboard prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Filter(FilterState),
    Clear,
    Reconnect,
    RequestSnapshot(String),
    Quit,
}

impl FromStr for UserAction {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(CommandError::Empty)?;
        let arg = words.next();

        match verb.to_ascii_lowercase().as_str() {
            "filter" | "f" => {
                let raw = arg.ok_or(CommandError::MissingArgument("filter"))?;
                raw.parse()
                    .map(UserAction::Filter)
                    .map_err(|e| CommandError::BadFilter(e.to_string()))
            }
            "clear" => Ok(UserAction::Clear),
            "reconnect" | "r" => Ok(UserAction::Reconnect),
            "snap" | "snapshot" => arg
                .map(|id| UserAction::RequestSnapshot(id.to_string()))
                .ok_or(CommandError::MissingArgument("snap")),
            "quit" | "exit" | "q" => Ok(UserAction::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

pub const HELP: &str = "commands: filter <all|list|stack|queue|binary_tree>, clear, reconnect, snap <id>, quit";
