//! Line-command console: the host surface of the headless assistant.
//!
//! Commands are parsed and executed by [`run_command`], which returns the
//! text to print. Keeping execution free of stdin/stdout makes the whole
//! command set unit-testable.

use std::sync::Arc;

use condovoice_core::state::StateCommand;
use condovoice_core::{AssistantEngine, CondoVoiceError};
use parking_lot::Mutex;

use crate::registry::CondoRegistry;

const HELP: &str = "\
commands:
  listen                 open a listening session (microphone)
  stop                   ask the recognizer to finish early
  say <text>             dispatch typed text as a command
  tickets                list maintenance tickets (newest first)
  condos                 list managed condominiums
  condo add <name>       register a condominium
  condo rename <id> <n>  rename a condominium
  condo rm <id>          remove a condominium
  condo select <id|all>  scope the assistant to one condominium
  screen                 show the active screen
  stats                  dispatch diagnostics counters
  help                   this text
  quit                   exit";

/// What the REPL should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleOutcome {
    /// Print this and read the next line.
    Continue(String),
    Quit,
}

pub fn run_command(
    line: &str,
    engine: &Arc<AssistantEngine>,
    registry: &Arc<Mutex<CondoRegistry>>,
) -> ConsoleOutcome {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };

    let output = match command {
        "" => String::new(),
        "help" => HELP.into(),
        "quit" | "exit" => return ConsoleOutcome::Quit,
        "listen" => match engine.start_session() {
            Ok(id) => format!("listening (session {id})"),
            Err(CondoVoiceError::RecognitionUnsupported) => {
                "speech recognition unavailable on this host — use `say <text>`".into()
            }
            Err(e) => format!("cannot listen: {e}"),
        },
        "stop" => match engine.stop_session() {
            Ok(()) => "stopping".into(),
            Err(e) => format!("{e}"),
        },
        "say" => {
            if rest.is_empty() {
                "usage: say <text>".into()
            } else {
                match engine.submit_text(rest) {
                    Ok(id) => format!("dispatched (session {id})"),
                    Err(e) => format!("cannot dispatch: {e}"),
                }
            }
        }
        "tickets" => list_tickets(engine),
        "condos" => list_condos(engine, registry),
        "condo" => condo_command(rest, engine, registry),
        "screen" => format!("active screen: {:?}", engine.state().lock().active_screen),
        "stats" => {
            let d = engine.diagnostics_snapshot();
            format!(
                "classifier calls: {}  errors: {}  unknown: {}  applied: {}  suppressed: {}",
                d.classifier_calls,
                d.classifier_errors,
                d.unknown_normalized,
                d.actions_applied,
                d.replies_suppressed
            )
        }
        other => format!("unknown command `{other}` — try `help`"),
    };

    ConsoleOutcome::Continue(output)
}

fn list_tickets(engine: &Arc<AssistantEngine>) -> String {
    let state = engine.state();
    let state = state.lock();
    if state.tickets.is_empty() {
        return "no maintenance tickets".into();
    }
    state
        .tickets
        .iter()
        .map(|t| {
            format!(
                "{}  [{}] {} — {} ({}, {})",
                t.id,
                t.status.as_str(),
                t.subject,
                t.location,
                t.urgency.as_str(),
                t.date
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn list_condos(engine: &Arc<AssistantEngine>, registry: &Arc<Mutex<CondoRegistry>>) -> String {
    let selected = engine.state().lock().selected_condo.clone();
    let registry = registry.lock();
    if registry.list().is_empty() {
        return "no condominiums registered".into();
    }
    registry
        .list()
        .iter()
        .map(|c| {
            let marker = match &selected {
                condovoice_core::domain::CondoSelection::One(id) if *id == c.id => "*",
                _ => " ",
            };
            format!(
                "{marker} {}  {} — {}, {} ({} units)",
                c.id, c.name, c.address, c.city, c.total_units
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn condo_command(
    rest: &str,
    engine: &Arc<AssistantEngine>,
    registry: &Arc<Mutex<CondoRegistry>>,
) -> String {
    let (sub, arg) = match rest.split_once(char::is_whitespace) {
        Some((s, a)) => (s, a.trim()),
        None => (rest, ""),
    };
    match sub {
        "add" if !arg.is_empty() => {
            let mut registry = registry.lock();
            let condo = registry.add(arg, "", "", "", 0);
            format!("added {} ({})", condo.name, condo.id)
        }
        "rename" if !arg.is_empty() => {
            let Some((id, name)) = arg.split_once(char::is_whitespace) else {
                return "usage: condo rename <id> <name>".into();
            };
            let name = name.trim();
            if registry.lock().update(id, |c| c.name = name.to_string()) {
                format!("renamed {id} to {name}")
            } else {
                format!("no condominium with id {id}")
            }
        }
        "rm" if !arg.is_empty() => {
            let mut registry = registry.lock();
            let selected = engine.state().lock().selected_condo.clone();
            match registry.remove(arg, &selected) {
                Some(next) => {
                    engine
                        .state()
                        .lock()
                        .reduce(StateCommand::SelectCondo(next));
                    format!("removed {arg}")
                }
                None => format!("no condominium with id {arg}"),
            }
        }
        "select" if !arg.is_empty() => match registry.lock().select(arg) {
            Some(selection) => {
                engine
                    .state()
                    .lock()
                    .reduce(StateCommand::SelectCondo(selection));
                format!("selected {arg}")
            }
            None => format!("no condominium with id {arg}"),
        },
        _ => "usage: condo add <name> | condo rm <id> | condo select <id|all>".into(),
    }
}
