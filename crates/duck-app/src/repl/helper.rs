//! rustyline helper: slash-command completion, hints and highlighting.

use std::borrow::Cow::{self, Borrowed, Owned};

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use super::commands::COMMANDS;

/// Commands whose argument is a saved history name.
const TAKES_HISTORY: &[&str] = &["/load", "/delete", "/save"];

#[derive(Clone, Default)]
pub struct ReplHelper {
    /// Saved history names, without extension.
    histories: Vec<String>,
}

impl ReplHelper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_histories(&mut self, histories: Vec<String>) {
        self.histories = histories;
    }

    fn candidates(&self, line: &str) -> (usize, Vec<String>) {
        if !line.starts_with('/') {
            return (0, Vec::new());
        }
        match line.split_once(' ') {
            None => (
                0,
                COMMANDS
                    .iter()
                    .map(|(name, _)| *name)
                    .filter(|name| name.starts_with(line))
                    .map(str::to_string)
                    .collect(),
            ),
            Some((command, arg)) if TAKES_HISTORY.contains(&command) => (
                command.len() + 1,
                self.histories
                    .iter()
                    .filter(|name| name.starts_with(arg))
                    .cloned()
                    .collect(),
            ),
            Some(_) => (0, Vec::new()),
        }
    }
}

impl Helper for ReplHelper {}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, candidates) = self.candidates(&line[..pos]);
        let pairs = candidates
            .into_iter()
            .map(|c| Pair {
                display: c.clone(),
                replacement: c,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .map(|(name, _)| *name)
            .find(|name| name.starts_with(line) && name.len() > line.len())
            .map(|name| name[line.len()..].to_string())
    }
}

impl Validator for ReplHelper {}
