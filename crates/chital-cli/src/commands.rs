/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text, sent to the current thread
    Say(String),
    New,
    Threads,
    /// Open by list index (1-based) or thread id
    Open(String),
    /// Re-run the reply to the last user message
    Retry,
    /// Replace the last user message and resend
    Edit(String),
    Models,
    Model(String),
    Delete,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Self::Empty;
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match (name, arg.is_empty()) {
            ("new", _) => Self::New,
            ("threads" | "list", _) => Self::Threads,
            ("open", false) => Self::Open(arg.to_string()),
            ("retry", _) => Self::Retry,
            ("edit", false) => Self::Edit(arg.to_string()),
            ("models", _) => Self::Models,
            ("model", false) => Self::Model(arg.to_string()),
            ("delete", _) => Self::Delete,
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit" | "q", _) => Self::Quit,
            _ => Self::Unknown(name.to_string()),
        }
    }
}

pub const HELP: &str = "\
Commands:
  <text>          send a message to the current thread
  /new            start a new thread
  /threads        list saved threads
  /open <n|id>    switch to a thread
  /retry          regenerate the last reply
  /edit <text>    replace your last message and resend
  /models         list installed models
  /model <name>   use a model for the current thread
  /delete         delete the current thread
  /quit           exit
Ctrl-C while a reply streams stops it.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_sent() {
        assert_eq!(Command::parse("Hello there\n"), Command::Say("Hello there".to_string()));
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(Command::parse("/open 2"), Command::Open("2".to_string()));
        assert_eq!(Command::parse("/model  llama3.2 "), Command::Model("llama3.2".to_string()));
        assert_eq!(Command::parse("/edit Hi again"), Command::Edit("Hi again".to_string()));
    }

    #[test]
    fn test_missing_argument_is_unknown() {
        assert_eq!(Command::parse("/open"), Command::Unknown("open".to_string()));
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(Command::parse("   \n"), Command::Empty);
    }

    #[test]
    fn test_aliases() {
        assert_eq!(Command::parse("/q"), Command::Quit);
        assert_eq!(Command::parse("/list"), Command::Threads);
    }
}
