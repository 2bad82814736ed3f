mod access;
mod command;

pub use access::AllowList;
pub use command::Command;

use std::collections::HashSet;
use tracing::{debug, error, info};

use crate::core::error::StoreError;
use crate::core::store::EntryStore;
use crate::core::store::types::UserId;

/// Typing this instead of a note starts the timer without one.
const SKIP_NOTE: &str = "x";

const NOTE_PROMPT: &str =
    "Please enter your note or type 'x' if you do not wish to provide a note.";
const STOPPED: &str = "❌ Timer is stopped.";
const UNKNOWN_COMMAND: &str = "Unknown command. Type /help to see available commands.";
const STORAGE_DOWN: &str = "⚠️ Storage is unavailable right now. Please try again later.";
const HELP: &str = "Available commands:\n\
/start - Starts timer with optional note\n\
/stop - Stops timer\n\
/help - Show this help message";

/// Users whose next message is the note for a start they just requested.
#[derive(Debug, Default)]
struct PendingNotes {
    users: HashSet<UserId>,
}

impl PendingNotes {
    fn insert(&mut self, user: &UserId) {
        self.users.insert(user.clone());
    }

    fn contains(&self, user: &UserId) -> bool {
        self.users.contains(user)
    }

    fn remove(&mut self, user: &UserId) -> bool {
        self.users.remove(user)
    }
}

/// Per-user start/stop state machine driven by chat messages.
///
/// A user is `Idle`, `Active` (an active entry exists in the store) or
/// awaiting a note. Only the awaiting-note state lives here; the rest is
/// derived from storage.
pub struct TrackingMachine {
    store: EntryStore,
    pending: PendingNotes,
}

impl TrackingMachine {
    pub fn new(store: EntryStore) -> Self {
        Self {
            store,
            pending: PendingNotes::default(),
        }
    }

    /// Handles one incoming message and returns the reply to send, if any.
    ///
    /// While a note is pending, any message (commands included) is taken as
    /// the note. Plain text outside that state gets no reply.
    pub async fn handle(&mut self, user: &UserId, text: &str) -> Option<String> {
        if self.pending.contains(user) {
            return Some(self.complete_pending(user, text).await);
        }

        let command = Command::parse(text)?;
        info!(user_id = %user, ?command, "Handling command");
        let reply = match command {
            Command::Start(Some(note)) => self.start(user, &note).await,
            Command::Start(None) => {
                self.pending.insert(user);
                NOTE_PROMPT.to_string()
            }
            Command::Stop => self.stop(user).await,
            Command::Help => HELP.to_string(),
            Command::Unknown(name) => {
                debug!(user_id = %user, command = %name, "Unknown command");
                UNKNOWN_COMMAND.to_string()
            }
        };
        Some(reply)
    }

    /// Whether the user's next message will be taken as a note.
    pub fn is_awaiting_note(&self, user: &UserId) -> bool {
        self.pending.contains(user)
    }

    async fn complete_pending(&mut self, user: &UserId, text: &str) -> String {
        let note = if text == SKIP_NOTE { "" } else { text };
        let reply = self.start(user, note).await;
        self.pending.remove(user);
        reply
    }

    async fn start(&self, user: &UserId, note: &str) -> String {
        match self.store.create_entry(user, note).await {
            Ok(entry) => {
                info!(user_id = %user, entry_id = entry.id, "Timer started");
                let mut reply = "⏲️ Timer is started.".to_string();
                if !entry.note.is_empty() {
                    reply.push_str(" Note is: ");
                    reply.push_str(&entry.note);
                }
                reply.push_str("\nUse /stop for stopping timer.");
                reply
            }
            Err(e) => failure_reply(user, e),
        }
    }

    async fn stop(&mut self, user: &UserId) -> String {
        match self.store.stop_entry(user).await {
            Ok(entry) => {
                info!(user_id = %user, entry_id = entry.id, "Timer stopped");
                self.pending.remove(user);
                STOPPED.to_string()
            }
            Err(e) => failure_reply(user, e),
        }
    }
}

fn failure_reply(user: &UserId, err: StoreError) -> String {
    if err.is_unavailable() {
        error!(user_id = %user, "Tracking storage failure: {}", err);
        STORAGE_DOWN.to_string()
    } else {
        info!(user_id = %user, "Rejected tracking request: {}", err);
        err.to_string()
    }
}
