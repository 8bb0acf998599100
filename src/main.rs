use std::process::ExitCode;

use btindex::{Args, Config, Session, ShellResult};
use clap::Parser;
use rustyline::{DefaultEditor, error::ReadlineError};
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "btindex> ";

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

fn run_commands(session: &mut Session, commands: &[String]) -> ShellResult<()> {
    for line in commands {
        let reply = session.run_line(line)?;
        if !reply.output.is_empty() {
            println!("{}", reply.output);
        }
        if reply.exit {
            break;
        }
    }
    Ok(())
}

fn repl(session: &mut Session) -> ShellResult<()> {
    let mut editor = DefaultEditor::new()?;

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line.as_str());

        match session.run_line(&line) {
            Ok(reply) => {
                if !reply.output.is_empty() {
                    println!("{}", reply.output);
                }
                if reply.exit {
                    break;
                }
            }
            Err(e) => eprintln!("error: {}", e),
        }
    }
    Ok(())
}

fn run(config: Config) -> ShellResult<()> {
    let mut session = Session::new(config.clone())?;

    if let Some(path) = &config.preload {
        let summary = session.load(path)?;
        tracing::info!(target: "btindex::shell", "{}", summary);
    }

    if config.commands.is_empty() {
        repl(&mut session)
    } else {
        run_commands(&mut session, &config.commands)
    }
}

fn main() -> ExitCode {
    let config = match Config::from_args(Args::parse()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.log_filter);

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
