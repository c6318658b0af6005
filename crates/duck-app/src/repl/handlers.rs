//! Slash command handlers.

use duck_ai::{DuckError, Session, SessionRecord};
use duck_common::DuckChatError;
use rustyline::error::ReadlineError;
use tracing::info;

use super::commands::Command;
use super::{interruptible, menu, print_stream, render, Flow, InputMode, Repl, UiContext};

fn chat(e: DuckError) -> DuckChatError {
    DuckChatError::Chat(e.to_string())
}

fn input(e: ReadlineError) -> DuckChatError {
    DuckChatError::Other(format!("input error: {e}"))
}

impl Repl {
    pub(super) async fn dispatch(
        &mut self,
        command: Command,
        ctx: &mut UiContext,
        session: &mut Session,
    ) -> Result<Flow, DuckChatError> {
        match command {
            Command::Help => render::help(),
            Command::SingleLine => {
                ctx.input_mode = InputMode::SingleLine;
                render::notice("Switched to singleline mode, validate is done by <enter>");
            }
            Command::MultiLine => {
                ctx.input_mode = InputMode::MultiLine;
                render::notice("Switched to multiline mode, validate is done by EOF <Ctrl+D>");
            }
            Command::Stream => {
                ctx.streaming = !ctx.streaming;
                render::notice(if ctx.streaming {
                    "Streaming answers enabled"
                } else {
                    "Streaming answers disabled"
                });
            }
            Command::Retry(n) => self.retry(n, ctx, session).await?,
            Command::Save(name) => self.save(name, session)?,
            Command::Load(name) => self.load(name, ctx, session)?,
            Command::Delete(name) => self.delete(name)?,
            Command::Histories => self.histories()?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    async fn retry(
        &mut self,
        n: usize,
        ctx: &mut UiContext,
        session: &mut Session,
    ) -> Result<(), DuckChatError> {
        if session.conversation().is_empty() {
            render::notice("Nothing to retry yet");
            return Ok(());
        }
        render::response_banner(n.clamp(1, session.turn_count().max(1)));
        let result = if ctx.streaming {
            interruptible(async { print_stream(session.retry_streaming(n).await).await }).await
        } else {
            interruptible(async { session.retry(n).await.map(|answer| render::answer(&answer)) })
                .await
        };
        self.after_answer(result, ctx, session);
        Ok(())
    }

    fn save(&mut self, name: Option<String>, session: &Session) -> Result<(), DuckChatError> {
        let name = match name {
            Some(name) => name,
            None => match self.editor.readline("Enter new file name: ") {
                Ok(name) if !name.trim().is_empty() => name.trim().to_string(),
                Ok(_) | Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                    render::notice("Save cancelled");
                    return Ok(());
                }
                Err(e) => return Err(input(e)),
            },
        };

        let path = self.store.save(&name, &session.to_record())?;
        info!("saved conversation to {}", path.display());
        render::notice(&format!("Saved to {}", path.display()));
        self.refresh_histories();
        Ok(())
    }

    fn load(
        &mut self,
        name: Option<String>,
        ctx: &mut UiContext,
        session: &mut Session,
    ) -> Result<(), DuckChatError> {
        let Some(name) = self.choose_history(name)? else {
            return Ok(());
        };
        let record: SessionRecord = self.store.load(&name)?;
        *session = Session::from_record(session.transport(), record).map_err(chat)?;
        ctx.sync_turn(session);
        render::notice(&format!(
            "Loaded {name}: {} exchanges with {}",
            session.turn_count(),
            session.model().name()
        ));
        Ok(())
    }

    fn delete(&mut self, name: Option<String>) -> Result<(), DuckChatError> {
        let Some(name) = self.choose_history(name)? else {
            return Ok(());
        };
        self.store.delete(&name)?;
        render::notice(&format!("Deleted {name}"));
        self.refresh_histories();
        Ok(())
    }

    fn histories(&mut self) -> Result<(), DuckChatError> {
        let names = self.store.list()?;
        if names.is_empty() {
            render::notice("No saved conversations");
        } else {
            render::numbered("history", &names);
        }
        Ok(())
    }

    /// The given name, or one picked from the saved histories.
    fn choose_history(&mut self, name: Option<String>) -> Result<Option<String>, DuckChatError> {
        if name.is_some() {
            return Ok(name);
        }
        let names = self.store.list()?;
        if names.is_empty() {
            render::notice("No saved conversations");
            return Ok(None);
        }
        let choice = menu::pick(&mut self.editor, "history", &names).map_err(input)?;
        Ok(choice.map(|i| names[i].clone()))
    }
}
