use clap::Parser;

use duck_ai::ModelType;

/// duck-chat: chat with the DuckDuckGo AI models from the terminal.
#[derive(Parser, Debug)]
#[command(name = "duck-chat", version, about)]
pub struct Args {
    /// Model to talk to, by name (Claude, o3mini, ...) or wire id.
    #[arg(short, long)]
    pub model: Option<ModelType>,

    /// Start with streaming answers enabled.
    #[arg(short, long)]
    pub stream: bool,

    /// Start in multi-line input mode (submit with Ctrl+D).
    #[arg(long)]
    pub multiline: bool,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Write the default config file listing every model, then exit.
    #[arg(long)]
    pub generate: bool,
}

pub fn parse() -> Args {
    Args::parse()
}
