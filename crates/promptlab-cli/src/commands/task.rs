use std::io::{IsTerminal, Read};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use promptlab_core::{PromptOptions, TaskKind};

use super::utils::{describe_error, open_session};
use crate::{GlobalArgs, TaskArgs};

/// Parses one `-o key=value` argument.
pub fn parse_option(raw: &str) -> Result<(String, String), String> {
    PromptOptions::parse_assignment(raw)
}

/// Runs one task and prints its output. Setup problems are returned as
/// errors; a failed generation is reported in red and yields a failing exit
/// code.
pub async fn run(task: TaskKind, global: &GlobalArgs, args: TaskArgs) -> Result<ExitCode> {
    match execute(task, global, args).await? {
        Ok(output) => {
            println!("{}", output);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::warn!("[CLI] Task {} failed: {}", task, err);
            eprintln!("{}", describe_error(&err).red());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn execute(
    task: TaskKind,
    global: &GlobalArgs,
    args: TaskArgs,
) -> Result<promptlab_core::Result<String>> {
    let text = match args.text {
        Some(text) => text,
        None => read_stdin()?,
    };
    let options: PromptOptions = args.options.into_iter().collect();

    let handle = open_session(global).await?;
    tracing::debug!(task = %task, model = handle.session.model(), "[CLI] Dispatching task");

    let outcome = handle.session.run_task(task, &text, &options).await;

    // Flush pending retry notices before the result is printed
    drop(handle.session);
    handle.printer.await.ok();

    Ok(outcome)
}

fn read_stdin() -> Result<String> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        bail!("No input text given. Pass TEXT or pipe it on stdin.");
    }
    let mut buffer = String::new();
    stdin
        .read_to_string(&mut buffer)
        .context("Failed to read input from stdin")?;
    Ok(buffer)
}
