//! `unread`: print what arrived in every conversation with unread messages.

use std::io::Write;

use serde::Deserialize;
use serde_json::Value;

use crate::api::{ApiError, PageSource};
use crate::directory::DirectoryCache;
use crate::error::CommandError;
use crate::history::{Message, unread_history_path};
use crate::output::Emphasis;
use crate::pager::traverse;

pub const READ_STATE_PATH: &str = "readstate?expand=items.unreadCount";

#[derive(Debug, Clone)]
pub struct ReadState {
    pub key: Option<String>,
    pub mid: Option<String>,
    pub unread: u64,
    pub raw: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadStateItem {
    #[serde(default)]
    xmpp_jid: Option<String>,
    #[serde(default)]
    mid: Option<String>,
    #[serde(default)]
    unread_count: Option<UnreadCount>,
}

#[derive(Debug, Deserialize)]
struct UnreadCount {
    #[serde(default)]
    count: u64,
}

impl ReadState {
    fn from_item(raw: Value) -> Self {
        let item = ReadStateItem::deserialize(&raw).ok();
        let (key, mid, unread) = match item {
            Some(item) => (
                item.xmpp_jid,
                item.mid,
                item.unread_count.map(|unread| unread.count).unwrap_or(0),
            ),
            None => (None, None, 0),
        };
        Self { key, mid, unread, raw }
    }
}

/// The read-state listing has only ever been seen as a single page, so this
/// reads one page and reports any `next` link instead of following it.
pub fn fetch_read_states<S: PageSource + ?Sized>(source: &S) -> Result<Vec<ReadState>, ApiError> {
    let page = source.fetch_page(READ_STATE_PATH)?;
    if let Some(next) = page.links.next.as_deref() {
        tracing::warn!(%next, "read-state listing is paged; only the first page is used");
    }
    Ok(page.items.into_iter().map(ReadState::from_item).collect())
}

pub fn summarize<S, W>(
    source: &S,
    cache: &DirectoryCache,
    emphasis: Emphasis,
    out: &mut W,
) -> Result<(), CommandError>
where
    S: PageSource + ?Sized,
    W: Write,
{
    let unread: Vec<ReadState> = fetch_read_states(source)?
        .into_iter()
        .filter(|state| state.unread > 0)
        .collect();
    tracing::debug!(conversations = unread.len(), "unread conversations");

    let directory = cache.load_or_rebuild(source)?;

    for state in unread {
        let Some(entry) = state.key.as_deref().and_then(|key| directory.get(key)) else {
            writeln!(out, "{}", state.raw)?;
            continue;
        };

        let base = entry.history_path();
        let path = match state.mid.as_deref() {
            Some(mid) => unread_history_path(&base, mid),
            None => base,
        };

        let mut lines = Vec::new();
        for item in traverse(source, path) {
            let Some(message) = Message::from_item(&item?) else {
                continue;
            };
            if message.is_card {
                continue;
            }
            lines.push(format!("{}: {}", message.sender_name, message.text));
        }

        if lines.is_empty() {
            continue;
        }
        writeln!(out, "{}", emphasis.heading(entry.display_name()))?;
        for line in lines {
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}
