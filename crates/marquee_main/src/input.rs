/// One line read at the interactive prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Message(String),
    /// Starts a fresh session.
    New,
    Info,
    Exit,
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line {
            "" => Command::Empty,
            "/new" => Command::New,
            "/info" => Command::Info,
            "/exit" | "/quit" => Command::Exit,
            _ => Command::Message(line.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse() {
        let cases = [
            ("  ", Command::Empty),
            ("/new", Command::New),
            (" /info ", Command::Info),
            ("/quit", Command::Exit),
            ("/exit", Command::Exit),
            (
                " Plot ratings by year ",
                Command::Message("Plot ratings by year".to_string()),
            ),
            ("/unknown", Command::Message("/unknown".to_string())),
        ];
        for (fixture, expected) in cases {
            assert_eq!(Command::parse(fixture), expected);
        }
    }
}
