//! REPL – the operator shell.
//!
//! Supported slash-commands:
//!   /auto on|off         – toggle autonomous drive
//!   /manual on|off       – toggle manual drive
//!   /drive <direction>   – forward, backward, left, right, stop or target:<name>
//!   /prompt <prompt>     – replace the detector prompt
//!   /targets a, b, …     – replace the target labels
//!   /obstacles a, b, …   – replace the obstacle labels
//!   /status              – mode, prompt and last command
//!   /help                – show this list
//!   /quit | /exit        – stop the robot and exit

use std::io::{self, BufRead, Write};
use std::sync::{Arc, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use scout_runtime::{ControlPlane, ManualOutcome, ModeStatus, PromptUpdate};
use scout_types::{ClassificationContext, MovementIntent, ScoutError};

/// Successful result of one shell command.
#[derive(Debug, PartialEq)]
pub enum Reply {
    Mode(ModeStatus),
    Manual(ManualOutcome),
    Context(Arc<ClassificationContext>),
    Status(StatusReport),
    Help,
    Quit,
}

/// Snapshot printed by `/status`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub mode: ModeStatus,
    pub prompt: String,
    pub target: String,
    pub last_command: Option<MovementIntent>,
    pub commands_sent: u64,
}

/// Entry point for the interactive shell.
///
/// `shutdown` is polled each iteration; `/quit` sets it.
pub fn run(control: Arc<ControlPlane>, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "scout>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let cmd = line.trim();
        if cmd.is_empty() {
            continue;
        }

        match execute(cmd, &control) {
            Ok(Reply::Quit) => {
                println!("{}", "Stopping the robot. Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Ok(reply) => render(&reply),
            Err(e) => println!("{} {}", "✗".red().bold(), e.to_string().red()),
        }
    }
}

/// Parse and run one command line against `control`.
pub fn execute(line: &str, control: &ControlPlane) -> Result<Reply, ScoutError> {
    let (cmd, arg) = match line.trim().split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line.trim(), ""),
    };

    match cmd {
        "/auto" => parse_switch(cmd, arg).map(|on| Reply::Mode(control.set_autonomous(on))),
        "/manual" => parse_switch(cmd, arg).map(|on| Reply::Mode(control.set_manual(on))),
        "/drive" => control.manual_command(arg).map(Reply::Manual),
        "/prompt" => {
            let ctx = control.context();
            control
                .update_prompt(PromptUpdate {
                    prompt: Some(arg.to_string()),
                    ..current_roles(&ctx)
                })
                .map(Reply::Context)
        }
        "/targets" => {
            let ctx = control.context();
            control
                .update_prompt(PromptUpdate {
                    target_objects: Some(parse_list(cmd, arg)?),
                    ..current_roles(&ctx)
                })
                .map(Reply::Context)
        }
        "/obstacles" => {
            let ctx = control.context();
            control
                .update_prompt(PromptUpdate {
                    obstacles: Some(parse_list(cmd, arg)?),
                    ..current_roles(&ctx)
                })
                .map(Reply::Context)
        }
        "/status" => Ok(Reply::Status(status(control))),
        "/help" => Ok(Reply::Help),
        "/quit" | "/exit" => Ok(Reply::Quit),
        other => Err(ScoutError::InvalidRequest(format!(
            "unknown command '{other}', type /help for available commands"
        ))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Prompt update that keeps everything from `ctx`.
fn current_roles(ctx: &ClassificationContext) -> PromptUpdate {
    PromptUpdate {
        prompt: Some(ctx.prompt.clone()),
        target: Some(ctx.target.clone()),
        target_objects: Some(ctx.target_labels.iter().cloned().collect()),
        obstacles: Some(ctx.obstacle_labels.iter().cloned().collect()),
    }
}

fn parse_switch(cmd: &str, arg: &str) -> Result<bool, ScoutError> {
    match arg {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(ScoutError::InvalidRequest(format!("usage: {cmd} on|off"))),
    }
}

fn parse_list(cmd: &str, arg: &str) -> Result<Vec<String>, ScoutError> {
    let items: Vec<String> = arg
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() {
        return Err(ScoutError::InvalidRequest(format!("usage: {cmd} a, b, ...")));
    }
    Ok(items)
}

fn status(control: &ControlPlane) -> StatusReport {
    let ctx = control.context();
    let (last_command, commands_sent) = {
        let dispatcher = control.dispatcher().lock().unwrap_or_else(PoisonError::into_inner);
        (dispatcher.last_command(), dispatcher.commands_sent())
    };
    StatusReport {
        mode: control.status(),
        prompt: ctx.prompt.clone(),
        target: ctx.target.clone(),
        last_command,
        commands_sent,
    }
}

fn on_off(flag: bool) -> colored::ColoredString {
    if flag { "on".green().bold() } else { "off".dimmed() }
}

fn render(reply: &Reply) {
    match reply {
        Reply::Mode(mode) => {
            println!("  autonomous: {}  manual: {}", on_off(mode.autonomous), on_off(mode.manual));
        }
        Reply::Manual(ManualOutcome::Forwarded(outcome)) => {
            println!("  {} {:?}", "→".green(), outcome);
        }
        Reply::Manual(ManualOutcome::Throttled) => {
            println!("  {}", "throttled (same direction)".dimmed());
        }
        Reply::Manual(ManualOutcome::TargetSelected(name)) => {
            println!("  {} target selected: {}", "✓".green(), name.bold());
        }
        Reply::Context(ctx) => {
            println!("  {} prompt: {}", "✓".green(), ctx.prompt.yellow());
            println!("    targets:   {}", join(&ctx.target_labels));
            println!("    obstacles: {}", join(&ctx.obstacle_labels));
        }
        Reply::Status(report) => {
            println!("{}", "Scout Status".bold().underline());
            println!(
                "  autonomous : {}\n  manual     : {}",
                on_off(report.mode.autonomous),
                on_off(report.mode.manual)
            );
            println!("  looking for: {}", report.target.bold());
            println!("  prompt     : {}", report.prompt.yellow());
            let last = report.last_command.map_or("none", MovementIntent::as_str);
            println!("  last cmd   : {}  ({} sent)", last.cyan(), report.commands_sent);
        }
        Reply::Help => cmd_help(),
        Reply::Quit => {}
    }
}

fn join<'a>(labels: impl IntoIterator<Item = &'a String>) -> String {
    labels.into_iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn cmd_help() {
    println!();
    println!("{}", "Scout Commands".bold().underline());
    println!("  {}        – toggle autonomous drive", "/auto on|off".bold().cyan());
    println!("  {}      – toggle manual drive", "/manual on|off".bold().cyan());
    println!("  {}    – forward, backward, left, right, stop, target:<name>", "/drive <dir>".bold().cyan());
    println!("  {} – replace the detector prompt", "/prompt <prompt>".bold().cyan());
    println!("  {}     – replace the target labels", "/targets a, b".bold().cyan());
    println!("  {}   – replace the obstacle labels", "/obstacles a, b".bold().cyan());
    println!("  {}             – mode, prompt and last command", "/status".bold().cyan());
    println!("  {}        – stop the robot and exit", "/quit  /exit".bold().cyan());
    println!();
}
