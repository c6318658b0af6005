//! Slash command parsing.

/// `(command, description)` in help order.
pub const COMMANDS: &[(&str, &str)] = &[
    ("/help", "Display the help message"),
    ("/singleline", "Enable singleline mode, validate is done by <enter>"),
    ("/multiline", "Enable multiline mode, validate is done by EOF <Ctrl+D>"),
    ("/stream", "Toggle streaming answers"),
    ("/retry", "/retry <n>: regenerate the answer to input n (0 starts over)"),
    ("/save", "/save [name]: save the conversation"),
    ("/load", "/load [name]: load a saved conversation"),
    ("/delete", "/delete [name]: delete a saved conversation"),
    ("/histories", "List saved conversations"),
    ("/quit", "Quit"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    SingleLine,
    MultiLine,
    Stream,
    Retry(usize),
    Save(Option<String>),
    Load(Option<String>),
    Delete(Option<String>),
    Histories,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Unknown(String),
    Usage(&'static str),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "/help",
            Command::SingleLine => "/singleline",
            Command::MultiLine => "/multiline",
            Command::Stream => "/stream",
            Command::Retry(_) => "/retry",
            Command::Save(_) => "/save",
            Command::Load(_) => "/load",
            Command::Delete(_) => "/delete",
            Command::Histories => "/histories",
            Command::Quit => "/quit",
        }
    }
}

pub fn is_command(input: &str) -> bool {
    input.starts_with('/')
}

/// Parse a line starting with `/`.
pub fn parse(input: &str) -> Result<Command, CommandError> {
    let input = input.trim();
    let (word, rest) = match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    };
    let name = (!rest.is_empty()).then(|| rest.to_string());

    let command = match word {
        "/help" => Command::Help,
        "/singleline" => Command::SingleLine,
        "/multiline" => Command::MultiLine,
        "/stream" => Command::Stream,
        "/retry" => match rest.parse() {
            Ok(n) => Command::Retry(n),
            Err(_) => return Err(CommandError::Usage("/retry <n>")),
        },
        "/save" | "/save_history" => Command::Save(name),
        "/load" | "/load_history" => Command::Load(name),
        "/delete" | "/delete_history" => Command::Delete(name),
        "/histories" => Command::Histories,
        "/quit" | "/exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(command)
}
