//! `edits`: match `s/old/new/` corrections to the message they fix.
//!
//! History is read oldest to newest. A correction always applies to the
//! latest plain message its sender posted before it; a new plain message
//! from the same sender replaces that target. Corrections from a sender with
//! no earlier message in the fetched window are dropped.

use std::collections::HashMap;
use std::io::Write;
use std::sync::LazyLock;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;

use crate::api::PageSource;
use crate::error::CommandError;
use crate::history::{Message, full_history_path};
use crate::output::Emphasis;
use crate::pager::traverse;

static EDIT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^s/([^/\n]+)/([^/\n]+)/?$").expect("edit pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditCommand {
    pub old: String,
    pub new: String,
}

impl EditCommand {
    /// No flags, no escapes: exactly `s/old/new` with an optional trailing `/`.
    pub fn parse(text: &str) -> Option<Self> {
        let captures = EDIT_PATTERN.captures(text)?;
        Some(Self {
            old: captures[1].to_string(),
            new: captures[2].to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Original {
    pub sender_name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub original: Original,
    pub edits: Vec<EditCommand>,
}

#[derive(Debug, Default)]
pub struct Reconciler {
    last_seen: HashMap<String, Original>,
    index: HashMap<Original, usize>,
    reconciled: Vec<Reconciliation>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, message: &Message) {
        if message.text.is_empty() {
            return;
        }
        match EditCommand::parse(&message.text) {
            Some(edit) => {
                let Some(original) = self.last_seen.get(&message.sender_id) else {
                    tracing::debug!(sender = %message.sender_name, "edit without an original in range");
                    return;
                };
                let slot = match self.index.get(original) {
                    Some(slot) => *slot,
                    None => {
                        self.index.insert(original.clone(), self.reconciled.len());
                        self.reconciled.push(Reconciliation {
                            original: original.clone(),
                            edits: Vec::new(),
                        });
                        self.reconciled.len() - 1
                    }
                };
                self.reconciled[slot].edits.push(edit);
            }
            None => {
                self.last_seen.insert(
                    message.sender_id.clone(),
                    Original {
                        sender_name: message.sender_name.clone(),
                        text: message.text.clone(),
                    },
                );
            }
        }
    }

    /// Originals that received at least one edit, in the order their first
    /// edit arrived.
    pub fn finish(self) -> Vec<Reconciliation> {
        self.reconciled
    }
}

/// Applies `edits` to `original` one at a time. Each returned line shows the
/// text before that edit is committed, with the edit marked inline. The
/// second value is the final text.
pub fn replay(original: &str, edits: &[EditCommand], emphasis: Emphasis) -> (Vec<String>, String) {
    let mut working = original.to_string();
    let mut lines = Vec::with_capacity(edits.len());
    for edit in edits {
        match working.find(&edit.old) {
            Some(at) => {
                let end = at + edit.old.len();
                lines.push(format!(
                    "{}{}{}",
                    &working[..at],
                    emphasis.replacement(&edit.old, &edit.new),
                    &working[end..]
                ));
                working.replace_range(at..end, &edit.new);
            }
            None => lines.push(working.clone()),
        }
    }
    (lines, working)
}

pub fn room_history_path(room: &str) -> String {
    let room = utf8_percent_encode(room, NON_ALPHANUMERIC);
    full_history_path(&format!("room/{room}/history/latest"))
}

pub fn reconcile_room<S: PageSource + ?Sized>(
    source: &S,
    room: &str,
) -> Result<Vec<Reconciliation>, CommandError> {
    let mut reconciler = Reconciler::new();
    for item in traverse(source, room_history_path(room)) {
        if let Some(message) = Message::from_item(&item?) {
            reconciler.observe(&message);
        }
    }
    Ok(reconciler.finish())
}

pub fn print_edits<S, W>(source: &S, room: &str, emphasis: Emphasis, out: &mut W) -> Result<(), CommandError>
where
    S: PageSource + ?Sized,
    W: Write,
{
    for reconciliation in reconcile_room(source, room)? {
        writeln!(out, "{}", emphasis.heading(&reconciliation.original.sender_name))?;
        let (lines, _) = replay(&reconciliation.original.text, &reconciliation.edits, emphasis);
        for line in lines {
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}
