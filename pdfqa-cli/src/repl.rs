//! Line parsing and rendering for the terminal chat.

use std::fmt::Write as _;

use pdfqa_session::Turn;

pub const HELP: &str = "\
Commands:
  :help               show this help
  :rate N [comment]   rate the last answer from 1 to 5
  :retry              retry the last failed question
  :export             export the conversation to the exports directory
  :quit               export and leave (also Ctrl-D)
Anything else is asked as a question.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Ask(String),
    Rate { rating: u8, comment: Option<String> },
    Retry,
    Export,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(rest) = line.strip_prefix(':') else {
            return Self::Ask(line.to_string());
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };
        match name {
            "help" | "h" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            "export" => Self::Export,
            "retry" => Self::Retry,
            "rate" => parse_rating(args),
            other => Self::Invalid(format!("unknown command ':{other}', type :help")),
        }
    }
}

fn parse_rating(args: &str) -> ReplCommand {
    let (value, comment) = match args.split_once(char::is_whitespace) {
        Some((value, comment)) => (value, Some(comment.trim().to_string())),
        None => (args, None),
    };
    match value.parse::<u8>() {
        Ok(rating) => ReplCommand::Rate { rating, comment: comment.filter(|c| !c.is_empty()) },
        Err(_) => ReplCommand::Invalid("usage: :rate N [comment], with N from 1 to 5".to_string()),
    }
}

/// Answer text followed by a numbered source list.
pub fn render_turn(turn: &Turn) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", turn.answer);
    if !turn.sources.is_empty() {
        out.push_str("\nSources:\n");
        for (i, source) in turn.sources.iter().enumerate() {
            let page = source.page.map(|p| format!(", page {p}")).unwrap_or_default();
            let _ = writeln!(out, "  [{}] {}{} (score {:.3})", i + 1, source.source, page, source.score);
        }
    }
    let cached = if turn.cached { ", cached" } else { "" };
    let _ = write!(out, "({} ms{cached})", turn.latency_ms);
    out
}
