pub const HELP_TEXT: &str = "\
Commands:
  /help           Show this help
  /new            Start a new conversation
  /sessions       List conversations
  /switch <id>    Switch to another conversation
  /auth           Print the Google authorization URL
  /code <code>    Finish authorization with the code Google shows you
  /events         List upcoming calendar events
  /tasks          List open tasks
  /memory         Show what Jarvis remembers about you
  /quit           Exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalCommand {
    Help,
    New,
    Sessions,
    Switch { id: String },
    Auth,
    Code { code: String },
    Events,
    Tasks,
    Memory,
    Quit,
}

pub enum LocalCommandResult {
    Command(LocalCommand),

    /// A slash command that could not be understood.
    Invalid { msg: String },

    /// Not a command; the input is sent to the assistant.
    Unhandled,
}

pub fn parse_local_command(input: &str) -> LocalCommandResult {
    let input = input.trim();
    if !input.starts_with('/') {
        return LocalCommandResult::Unhandled;
    }

    let (name, argument) = match input.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (input, ""),
    };

    let command = match name {
        "/help" => LocalCommand::Help,
        "/new" => LocalCommand::New,
        "/sessions" => LocalCommand::Sessions,
        "/switch" if argument.is_empty() => {
            return LocalCommandResult::Invalid {
                msg: "Usage: /switch <id>".to_string(),
            }
        }
        "/switch" => LocalCommand::Switch {
            id: argument.to_string(),
        },
        "/auth" => LocalCommand::Auth,
        "/code" if argument.is_empty() => {
            return LocalCommandResult::Invalid {
                msg: "Usage: /code <code>".to_string(),
            }
        }
        "/code" => LocalCommand::Code {
            code: argument.to_string(),
        },
        "/events" => LocalCommand::Events,
        "/tasks" => LocalCommand::Tasks,
        "/memory" => LocalCommand::Memory,
        "/exit" | "/quit" => LocalCommand::Quit,
        other => {
            return LocalCommandResult::Invalid {
                msg: format!("Unknown command {other}. Type /help for commands."),
            }
        }
    };
    LocalCommandResult::Command(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(input: &str) -> Option<LocalCommand> {
        match parse_local_command(input) {
            LocalCommandResult::Command(command) => Some(command),
            _ => None,
        }
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert!(matches!(
            parse_local_command("what's on today?"),
            LocalCommandResult::Unhandled
        ));
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(
            command("/switch 1726851600000"),
            Some(LocalCommand::Switch {
                id: "1726851600000".to_string()
            })
        );
        assert_eq!(
            command("  /code   4/0AbCd  "),
            Some(LocalCommand::Code {
                code: "4/0AbCd".to_string()
            })
        );
        assert_eq!(command("/exit"), Some(LocalCommand::Quit));
    }

    #[test]
    fn test_missing_argument_and_unknown_command() {
        assert!(matches!(
            parse_local_command("/code"),
            LocalCommandResult::Invalid { .. }
        ));
        assert!(matches!(
            parse_local_command("/settings"),
            LocalCommandResult::Invalid { msg } if msg.contains("/settings")
        ));
    }
}
