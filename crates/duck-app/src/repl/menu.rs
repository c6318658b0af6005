//! Numbered selection menus.

use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use super::helper::ReplHelper;
use super::render;

/// Show `options` and ask for a number. `None` when the user backs out
/// with an empty line, Ctrl+C or Ctrl+D.
pub fn pick(
    editor: &mut Editor<ReplHelper, DefaultHistory>,
    title: &str,
    options: &[String],
) -> Result<Option<usize>, ReadlineError> {
    if options.is_empty() {
        return Ok(None);
    }
    render::numbered(title, options);

    let prompt = format!("Select a number between 1-{}: ", options.len());
    loop {
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(None),
            Err(e) => return Err(e),
        };
        if line.trim().is_empty() {
            return Ok(None);
        }
        match parse_choice(&line, options.len()) {
            Some(index) => return Ok(Some(index)),
            None => render::error(&format!("{:?} is not a valid choice", line.trim())),
        }
    }
}

/// 1-based menu entry to 0-based index.
fn parse_choice(input: &str, len: usize) -> Option<usize> {
    match input.trim().parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Some(n - 1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_are_one_based() {
        assert_eq!(parse_choice("1", 3), Some(0));
        assert_eq!(parse_choice(" 3 ", 3), Some(2));
        assert_eq!(parse_choice("0", 3), None);
        assert_eq!(parse_choice("4", 3), None);
        assert_eq!(parse_choice("two", 3), None);
    }
}
