//! Terminal output.

use std::io::Write;

use colored::Colorize;
use duck_ai::{DuckError, ModelType};

use super::commands::COMMANDS;

pub fn welcome(model: ModelType) {
    println!("Using {}", model.id().red().bold().underline());
    println!("Type {} to display the help", "/help".blue().bold());
}

pub fn input_banner(turn: usize) {
    println!("{}", format!(" >>> input {turn}: ").white().on_blue());
}

pub fn response_banner(turn: usize) {
    println!("{}", format!(" <<< response {turn}: ").white().on_green());
}

/// Answers with code blocks are printed as-is so they can be copied.
pub fn answer(text: &str) {
    if text.contains("```") {
        println!("{text}");
    } else {
        println!("{}", text.green());
    }
}

pub fn chunk(text: &str) {
    print!("{}", text.green());
    let _ = std::io::stdout().flush();
}

pub fn end_of_stream() {
    println!();
}

pub fn help() {
    let width = COMMANDS.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, description) in COMMANDS {
        println!("- {} {description}", format!("{name:<width$}").red());
    }
}

pub fn command_ok(name: &str) {
    println!("{}", format!(" >>> Command {name} done ").green().on_black());
}

pub fn notice(message: &str) {
    println!("{}", message.yellow());
}

pub fn error(message: &str) {
    eprintln!("{}", message.red());
}

pub fn chat_error(e: &DuckError) {
    error(&format!("Error occurred: {e}"));
    if matches!(e, DuckError::ConversationLimitExceeded(_)) {
        notice("This conversation cannot grow any further: /retry an earlier input or restart.");
    }
}

pub fn limit_reached() {
    notice("The conversation has reached its length limit; the next question will be refused.");
}

/// Numbered table for menus.
pub fn numbered(title: &str, options: &[String]) {
    println!("{}", format!(" N°  {title} ").bold().red().on_white());
    for (i, option) in options.iter().enumerate() {
        println!(" {:<3} {option}", i + 1);
    }
    println!();
}
