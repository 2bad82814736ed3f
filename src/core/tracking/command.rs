/// A bot command as typed by the user, e.g. `/start write report`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(Option<String>),
    Stop,
    Help,
    Unknown(String),
}

impl Command {
    /// Parses a message into a command. Returns `None` for plain text.
    ///
    /// A `@botname` suffix on the command word is ignored, and everything after
    /// the first whitespace is the (trimmed) argument string.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.trim().strip_prefix('/')?;
        let (word, args) = match rest.split_once(char::is_whitespace) {
            Some((word, args)) => (word, args.trim()),
            None => (rest, ""),
        };
        let name = word.split_once('@').map_or(word, |(name, _)| name);

        Some(match name {
            "start" if args.is_empty() => Command::Start(None),
            "start" => Command::Start(Some(args.to_string())),
            "stop" => Command::Stop,
            "help" => Command::Help,
            other => Command::Unknown(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_with_and_without_note() {
        assert_eq!(Command::parse("/start"), Some(Command::Start(None)));
        assert_eq!(Command::parse("/start   "), Some(Command::Start(None)));
        assert_eq!(
            Command::parse("/start  fix login bug "),
            Some(Command::Start(Some("fix login bug".to_string())))
        );
    }

    #[test]
    fn strips_bot_mention() {
        assert_eq!(Command::parse("/stop@tracker_bot"), Some(Command::Stop));
        assert_eq!(
            Command::parse("/start@tracker_bot review"),
            Some(Command::Start(Some("review".to_string())))
        );
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn unknown_commands_keep_their_name() {
        assert_eq!(Command::parse("/help"), Some(Command::Help));
        assert_eq!(
            Command::parse("/pause now"),
            Some(Command::Unknown("pause".to_string()))
        );
    }
}
