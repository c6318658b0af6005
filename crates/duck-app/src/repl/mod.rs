//! Interactive front end.

mod commands;
mod handlers;
mod helper;
mod menu;
mod render;

use std::future::Future;

use duck_ai::{AnswerStream, DuckError, ModelType, Session};
use duck_platform::HistoryStore;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tracing::warn;

use commands::CommandError;
use helper::ReplHelper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Enter submits.
    SingleLine,
    /// Ctrl+D submits.
    MultiLine,
}

/// Front-end state handed to every command handler.
#[derive(Debug, Clone)]
pub struct UiContext {
    pub input_mode: InputMode,
    pub streaming: bool,
    /// Number of the next input, 1-based.
    pub turn: usize,
}

impl UiContext {
    pub fn new(multiline: bool, streaming: bool) -> Self {
        Self {
            input_mode: if multiline {
                InputMode::MultiLine
            } else {
                InputMode::SingleLine
            },
            streaming,
            turn: 1,
        }
    }

    pub fn sync_turn(&mut self, session: &Session) {
        self.turn = session.turn_count() + 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Quit,
}

enum Input {
    Text(String),
    Cancelled,
    Closed,
}

pub struct Repl {
    editor: Editor<ReplHelper, DefaultHistory>,
    store: HistoryStore,
}

impl Repl {
    pub fn new(store: HistoryStore) -> Result<Self, ReadlineError> {
        let mut editor = Editor::new()?;
        editor.set_helper(Some(ReplHelper::new()));
        let mut repl = Self { editor, store };
        repl.refresh_histories();
        Ok(repl)
    }

    /// Ask which model to use. `None` if the user backs out.
    pub fn pick_model(&mut self) -> Result<Option<ModelType>, ReadlineError> {
        let options: Vec<String> = ModelType::ALL
            .iter()
            .map(|m| format!("{:<8} {}", m.name(), m.id()))
            .collect();
        let choice = menu::pick(&mut self.editor, "model", &options)?;
        Ok(choice.map(|i| ModelType::ALL[i]))
    }

    pub async fn run(&mut self, mut session: Session, mut ctx: UiContext) {
        render::welcome(session.model());
        ctx.sync_turn(&session);

        loop {
            render::input_banner(ctx.turn);
            let text = match self.read_input(&ctx) {
                Ok(Input::Text(text)) => text,
                Ok(Input::Cancelled) => {
                    render::notice("Input cancelled. Type /quit to exit.");
                    continue;
                }
                Ok(Input::Closed) => break,
                Err(e) => {
                    render::error(&format!("input error: {e}"));
                    break;
                }
            };

            if commands::is_command(&text) {
                let command = match commands::parse(&text) {
                    Ok(command) => command,
                    Err(CommandError::Unknown(word)) => {
                        render::error(&format!("Command not found: {word}"));
                        render::notice("Type /help to display the help");
                        continue;
                    }
                    Err(CommandError::Usage(usage)) => {
                        render::error(&format!("usage: {usage}"));
                        continue;
                    }
                };
                let name = command.name();
                match self.dispatch(command, &mut ctx, &mut session).await {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => render::command_ok(name),
                    Err(e) => render::error(&e.to_string()),
                }
                continue;
            }

            if text.is_empty() {
                render::error("Empty input");
                continue;
            }

            render::response_banner(ctx.turn);
            let result = if ctx.streaming {
                interruptible(async { print_stream(session.ask_streaming(text).await).await }).await
            } else {
                interruptible(async { session.ask(text).await.map(|answer| render::answer(&answer)) })
                    .await
            };
            self.after_answer(result, &mut ctx, &session);
        }

        println!("Quit");
    }

    fn after_answer(&self, result: Result<(), DuckError>, ctx: &mut UiContext, session: &Session) {
        match result {
            Ok(()) => {
                if session.limit_reached() {
                    render::limit_reached();
                }
            }
            Err(e) => render::chat_error(&e),
        }
        ctx.sync_turn(session);
    }

    fn read_input(&mut self, ctx: &UiContext) -> Result<Input, ReadlineError> {
        match ctx.input_mode {
            InputMode::SingleLine => match self.editor.readline("") {
                Ok(line) => Ok(self.accept(line)),
                Err(ReadlineError::Interrupted) => Ok(Input::Cancelled),
                Err(ReadlineError::Eof) => Ok(Input::Closed),
                Err(e) => Err(e),
            },
            InputMode::MultiLine => {
                let mut lines = Vec::new();
                loop {
                    match self.editor.readline("") {
                        Ok(line) if lines.is_empty() && commands::is_command(line.trim()) => {
                            return Ok(self.accept(line));
                        }
                        Ok(line) => lines.push(line),
                        Err(ReadlineError::Interrupted) => return Ok(Input::Cancelled),
                        Err(ReadlineError::Eof) if lines.is_empty() => return Ok(Input::Closed),
                        Err(ReadlineError::Eof) => break,
                        Err(e) => return Err(e),
                    }
                }
                Ok(self.accept(lines.join("\n")))
            }
        }
    }

    fn accept(&mut self, text: String) -> Input {
        let text = text.trim().to_string();
        if !text.is_empty() {
            if let Err(e) = self.editor.add_history_entry(text.as_str()) {
                warn!("failed to record input history: {e}");
            }
        }
        Input::Text(text)
    }

    /// Feed saved history names to the completer.
    fn refresh_histories(&mut self) {
        let names = match self.store.list() {
            Ok(names) => names
                .into_iter()
                .map(|name| name.trim_end_matches(".json").to_string())
                .collect(),
            Err(e) => {
                warn!("failed to list histories: {e}");
                Vec::new()
            }
        };
        if let Some(helper) = self.editor.helper_mut() {
            helper.set_histories(names);
        }
    }
}

/// Run one exchange with the service. Ctrl+C abandons it, and dropping the
/// session future takes the prompt back out of the conversation.
async fn interruptible<F>(exchange: F) -> Result<(), DuckError>
where
    F: Future<Output = Result<(), DuckError>>,
{
    tokio::select! {
        result = exchange => result,
        _ = tokio::signal::ctrl_c() => {
            render::end_of_stream();
            render::notice("Answer abandoned.");
            Ok(())
        }
    }
}

/// Print a streamed answer as it arrives.
async fn print_stream(stream: Result<AnswerStream<'_>, DuckError>) -> Result<(), DuckError> {
    let mut stream = stream?;
    while let Some(chunk) = stream.next_chunk().await.inspect_err(|_| render::end_of_stream())? {
        render::chunk(&chunk);
    }
    render::end_of_stream();
    Ok(())
}
