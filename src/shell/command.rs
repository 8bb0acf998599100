use chumsky::{prelude::*, regex::regex};

use crate::btree::Key;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // INSERT key+
    Insert(Vec<Key>),

    // DELETE key+
    Delete(Vec<Key>),

    // SEARCH key+
    Search(Vec<Key>),

    // PRINT
    Print,

    // STATS
    Stats,

    // CHECK
    Check,

    // DUMP
    Dump,

    // LOAD path
    Load(String),

    // RESET order?
    Reset(Option<usize>),

    // HELP
    Help,

    // EXIT | QUIT
    Exit,
}

pub const HELP: &str = "\
commands (separate several with ';'):
  insert <key>...   add keys
  delete <key>...   remove keys
  search <key>...   locate keys
  print             level-by-level dump: [separator|count] keys
  stats             structural counters
  check             verify tree invariants
  dump              tree shape as JSON
  load <path>       insert every key in a CSV file
  reset [order]     start over with an empty tree
  help              this text
  exit | quit       leave the shell";

fn keyword<'a>(
    pattern: &'static str,
) -> impl Parser<'a, &'a str, &'a str, extra::Err<Rich<'a, char>>> {
    regex(pattern).padded()
}

fn key_list<'a>() -> impl Parser<'a, &'a str, Vec<Key>, extra::Err<Rich<'a, char>>> {
    regex(r"-?\d+")
        .try_map(|s: &str, span| {
            s.parse::<Key>()
                .map_err(|e| Rich::custom(span, format!("invalid key {}: {}", s, e)))
        })
        .padded()
        .repeated()
        .at_least(1)
        .collect::<Vec<Key>>()
}

pub fn parser<'a>() -> impl Parser<'a, &'a str, Vec<Command>, extra::Err<Rich<'a, char>>> {
    let insert = keyword(r"(?i)insert\b")
        .ignore_then(key_list())
        .map(Command::Insert);

    let delete = keyword(r"(?i)delete\b")
        .ignore_then(key_list())
        .map(Command::Delete);

    let search = keyword(r"(?i)search\b")
        .ignore_then(key_list())
        .map(Command::Search);

    let path = regex(r#"'[^']*'|[^\s;']+"#)
        .map(|s: &str| s.trim_matches('\'').to_string())
        .padded();
    let load = keyword(r"(?i)load\b").ignore_then(path).map(Command::Load);

    let order = regex(r"\d+")
        .try_map(|s: &str, span| {
            s.parse::<usize>()
                .map_err(|e| Rich::custom(span, format!("invalid order {}: {}", s, e)))
        })
        .padded();
    let reset = keyword(r"(?i)reset\b")
        .ignore_then(order.or_not())
        .map(Command::Reset);

    let command = choice((
        insert,
        delete,
        search,
        keyword(r"(?i)print\b").to(Command::Print),
        keyword(r"(?i)stats\b").to(Command::Stats),
        keyword(r"(?i)check\b").to(Command::Check),
        keyword(r"(?i)dump\b").to(Command::Dump),
        load,
        reset,
        keyword(r"(?i)help\b").to(Command::Help),
        keyword(r"(?i)(?:exit|quit)\b").to(Command::Exit),
    ));

    command
        .separated_by(just(';').padded())
        .allow_trailing()
        .collect::<Vec<Command>>()
        .padded()
        .then_ignore(end())
}

/// Parse one line of shell input into commands
pub fn parse_line(input: &str) -> Result<Vec<Command>, String> {
    parser().parse(input).into_result().map_err(|errs| {
        errs.iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    })
}
