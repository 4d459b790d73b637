//! Shared application state and the reducer interface the dispatcher writes
//! through.
//!
//! The dispatcher never touches screen collections directly: it emits
//! [`StateCommand`]s and `AppState::reduce` applies them. This keeps the
//! at-most-once-apply invariant checkable — a dispatch is exactly one batch
//! of commands, applied under one lock.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{CondoSelection, MaintenanceTicket, Screen, TicketStatus, Urgency};

/// Immutable snapshot of the UI state, captured when a listening session
/// starts and passed opaquely to the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub current_screen: Screen,
    pub open_maintenance_count: usize,
    pub selected_condo: CondoSelection,
}

/// A single state mutation produced by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum StateCommand {
    /// Insert a ticket at the head of the collection (newest first).
    InsertTicket(MaintenanceTicket),
    SetActiveScreen(Screen),
    SelectCondo(CondoSelection),
}

/// In-memory application state shared between the engine and the screens.
///
/// Everything here is ephemeral — discarded when the process exits.
#[derive(Debug, Clone)]
pub struct AppState {
    pub tickets: Vec<MaintenanceTicket>,
    pub active_screen: Screen,
    pub selected_condo: CondoSelection,
    next_ticket_id: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            tickets: Vec::new(),
            active_screen: Screen::Dashboard,
            selected_condo: CondoSelection::All,
            next_ticket_id: 1,
        }
    }

    /// Demo state with the two seed tickets the product ships with.
    ///
    /// Seeds go through the reducer in date order, so the collection ends up
    /// newest-first like every dispatch-time insert.
    pub fn seeded() -> Self {
        let mut state = Self::new();
        let older = MaintenanceTicket {
            id: state.mint_ticket_id(),
            subject: "Perdita acqua garage".into(),
            location: "Piano -1".into(),
            urgency: Urgency::High,
            status: TicketStatus::InProgress,
            date: NaiveDate::from_ymd_opt(2023, 10, 8).expect("valid seed date"),
            description: "Acqua che fuoriesce dal giunto.".into(),
        };
        let newer = MaintenanceTicket {
            id: state.mint_ticket_id(),
            subject: "Lampadina fulminata".into(),
            location: "Ingresso B".into(),
            urgency: Urgency::Low,
            status: TicketStatus::Open,
            date: NaiveDate::from_ymd_opt(2023, 10, 9).expect("valid seed date"),
            description: "Sostituzione plafoniera.".into(),
        };
        state.reduce(StateCommand::InsertTicket(older));
        state.reduce(StateCommand::InsertTicket(newer));
        state
    }

    /// Tickets not yet closed — what the context snapshot reports.
    pub fn open_ticket_count(&self) -> usize {
        self.tickets
            .iter()
            .filter(|t| t.status != TicketStatus::Closed)
            .count()
    }

    /// Mint a fresh unique ticket id (`mr-1`, `mr-2`, …).
    pub fn mint_ticket_id(&mut self) -> String {
        let id = format!("mr-{}", self.next_ticket_id);
        self.next_ticket_id += 1;
        id
    }

    /// Capture the immutable context passed to the classifier.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            current_screen: self.active_screen,
            open_maintenance_count: self.open_ticket_count(),
            selected_condo: self.selected_condo.clone(),
        }
    }

    /// Apply one command. The only mutation path the dispatcher uses.
    pub fn reduce(&mut self, command: StateCommand) {
        match command {
            StateCommand::InsertTicket(ticket) => self.tickets.insert(0, ticket),
            StateCommand::SetActiveScreen(screen) => self.active_screen = screen,
            StateCommand::SelectCondo(selection) => self.selected_condo = selection,
        }
    }
}
