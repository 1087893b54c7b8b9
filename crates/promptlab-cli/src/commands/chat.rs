use std::borrow::Cow::{self, Borrowed, Owned};

use anyhow::Result;
use colored::Colorize;
use promptlab_application::PromptLabSession;
use promptlab_core::Role;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use super::utils::{describe_error, open_session};
use crate::GlobalArgs;

const SLASH_COMMANDS: [&str; 3] = ["/clear", "/history", "/exit"];

/// Rustyline helper completing and hinting the slash commands.
#[derive(Clone, Default)]
struct ChatHelper;

impl ChatHelper {
    /// Slash commands starting with `prefix`, or none when `prefix` isn't a
    /// bare command word.
    fn matching(prefix: &str) -> impl Iterator<Item = &'static str> + '_ {
        let is_command = prefix.starts_with('/') && !prefix.contains(char::is_whitespace);
        SLASH_COMMANDS
            .into_iter()
            .filter(move |cmd| is_command && cmd.starts_with(prefix))
    }
}

impl Helper for ChatHelper {}

impl Completer for ChatHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let candidates = Self::matching(&line[..pos])
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for ChatHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        match classify(line) {
            ChatInput::Message(_) | ChatInput::Skip => Borrowed(line),
            _ => Owned(line.bright_cyan().to_string()),
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ChatHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let typed = &line[..pos];
        Self::matching(typed)
            .find(|cmd| cmd.len() > typed.len())
            .map(|cmd| cmd[typed.len()..].to_string())
    }
}

impl Validator for ChatHelper {}

/// What the REPL should do with one line of input.
#[derive(Debug, PartialEq)]
enum ChatInput<'a> {
    Skip,
    Exit,
    Clear,
    History,
    UnknownCommand(&'a str),
    Message(&'a str),
}

fn classify(line: &str) -> ChatInput<'_> {
    let trimmed = line.trim();
    match trimmed {
        "" => ChatInput::Skip,
        "quit" | "exit" | "/exit" | "/quit" => ChatInput::Exit,
        "/clear" => ChatInput::Clear,
        "/history" => ChatInput::History,
        cmd if cmd.starts_with('/') => ChatInput::UnknownCommand(cmd),
        text => ChatInput::Message(text),
    }
}

fn print_history(session: &PromptLabSession) {
    for message in session.conversation().visible() {
        let label = format!("[{}]", message.role());
        match message.role() {
            Role::User => println!("{} {}", label.green(), message.content()),
            Role::Assistant => println!("{} {}", label.bright_blue(), message.content()),
            Role::System => println!("{} {}", label.bright_black(), message.content()),
        }
    }
}

/// Runs the interactive chat loop until `/exit`, `quit` or CTRL-D.
pub async fn run(global: &GlobalArgs) -> Result<()> {
    let handle = open_session(global).await?;
    let mut session = handle.session;

    let mut rl = Editor::new()?;
    rl.set_helper(Some(ChatHelper));

    println!("{}", "=== PromptLab Chat ===".bright_magenta().bold());
    println!(
        "{}",
        format!(
            "Model: {} ({}). Type '/clear' to reset, '/history' to review, or 'quit' to exit.",
            session.model(),
            session.mode()
        )
        .bright_black()
    );
    println!();

    loop {
        match rl.readline(">> ") {
            Ok(line) => match classify(&line) {
                ChatInput::Skip => continue,
                ChatInput::Exit => {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
                ChatInput::Clear => {
                    session.clear_history();
                    println!("{}", "Chat history cleared.".yellow());
                }
                ChatInput::History => print_history(&session),
                ChatInput::UnknownCommand(cmd) => {
                    println!("{}", format!("Unknown command: {}", cmd).bright_black());
                }
                ChatInput::Message(text) => {
                    let _ = rl.add_history_entry(text);
                    println!("{}", format!("> {}", text).green());

                    match session.chat(text).await {
                        Ok(reply) => {
                            for line in reply.lines() {
                                println!("{}", line.bright_blue());
                            }
                        }
                        Err(err) => {
                            tracing::warn!("[Chat] Turn failed: {}", err);
                            eprintln!("{}", describe_error(&err).red());
                        }
                    }
                    println!();
                }
            },
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    // Closing the event channel lets the printer task finish
    drop(session);
    let _ = handle.printer.await;

    Ok(())
}
