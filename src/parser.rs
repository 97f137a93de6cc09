use std::fmt;

use crate::errors::SyntaxError;
use crate::lexer::{has_open_quote, split_unquoted, stage_words, target_words, unquoted_positions, MARKERS};

/// One command of a pipeline: the program name followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stage {
    args: Vec<String>,
}

impl Stage {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    /// The command name, or `""` for an empty stage.
    pub fn name(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or("")
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Structured form of one raw command line.
///
/// Redirections belong to the whole pipeline: `input` feeds the first stage
/// and `output` receives the last stage's standard output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedCommand {
    pub stages: Vec<Stage>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub background: bool,
    problem: Option<SyntaxError>,
}

impl ParsedCommand {
    /// Parse a raw line. Never fails: malformed input is recorded and
    /// reported later by [`ParsedCommand::validate`].
    ///
    /// Markers are handled in a fixed order: trailing `&`, then the first
    /// unquoted `>`, then the first unquoted `<`, then `|`.
    pub fn parse(line: &str) -> Self {
        let mut parsed = ParsedCommand::default();
        let mut text = line.trim_end().to_string();

        if is_background(&text) {
            text.pop();
            parsed.background = true;
        }

        if has_open_quote(&text) {
            parsed.problem = Some(SyntaxError::UnterminatedQuote);
        }

        let (rest, output) = take_redirection(&text, '>');
        text = rest;
        let (rest, input) = take_redirection(&text, '<');
        text = rest;

        for (marker, target) in [('>', &output), ('<', &input)] {
            if let Some(Err(())) = target {
                parsed.problem.get_or_insert(SyntaxError::MissingTarget(marker));
            }
        }
        parsed.output = output.and_then(Result::ok);
        parsed.input = input.and_then(Result::ok);

        let stages: Vec<Stage> = split_unquoted(&text, '|')
            .into_iter()
            .map(|piece| Stage::new(stage_words(piece)))
            .collect();

        let blank = stages.len() == 1
            && stages[0].is_empty()
            && parsed.input.is_none()
            && parsed.output.is_none()
            && parsed.problem.is_none()
            && !parsed.background;
        if !blank {
            parsed.stages = stages;
        }

        parsed
    }

    /// True for a line with nothing to run.
    pub fn is_blank(&self) -> bool {
        self.stages.is_empty() && self.problem.is_none()
    }

    /// Reject commands that must not run: unterminated quotes, redirection
    /// markers with no target, and empty stages.
    pub fn validate(&self) -> Result<(), SyntaxError> {
        if let Some(problem) = self.problem {
            return Err(problem);
        }
        if self.stages.iter().any(Stage::is_empty) {
            return Err(SyntaxError::EmptyStage);
        }
        Ok(())
    }
}

impl fmt::Display for ParsedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stages: Vec<String> = self.stages.iter().map(|s| s.args.join(" ")).collect();
        write!(f, "{}", stages.join(" | "))?;
        if let Some(input) = &self.input {
            write!(f, " <{}", input)?;
        }
        if let Some(output) = &self.output {
            write!(f, " >{}", output)?;
        }
        if self.background {
            write!(f, " &")?;
        }
        Ok(())
    }
}

/// A trailing `&` counts only as a standalone word.
fn is_background(text: &str) -> bool {
    match text.strip_suffix('&') {
        Some(before) => before.ends_with(char::is_whitespace),
        None => false,
    }
}

/// Remove the first unquoted `marker` and the word after it from `text`.
///
/// Returns the remaining command text and, when the marker was present,
/// either the target word or `Err(())` for a marker with nothing usable
/// after it. Text following the target stays part of the command.
fn take_redirection(text: &str, marker: char) -> (String, Option<Result<String, ()>>) {
    let Some(&at) = unquoted_positions(text, marker).first() else {
        return (text.to_string(), None);
    };

    let left = &text[..at];
    let right = &text[at + marker.len_utf8()..];

    if right.trim_start().starts_with(MARKERS) {
        return (format!("{}{}", left, right), Some(Err(())));
    }

    let (words, end) = target_words(right);
    match words.into_iter().next() {
        Some(target) => {
            let rest = &right[end..];
            (format!("{}{}", left, rest), Some(Ok(target)))
        }
        None => (format!("{}{}", left, right), Some(Err(()))),
    }
}
