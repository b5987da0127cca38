use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender_name: String,
    pub sender_id: String,
    pub text: String,
    pub is_card: bool,
}

#[derive(Debug, Deserialize)]
struct HistoryItem {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    from: Option<Sender>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    card: Option<Value>,
}

// Notifications carry the integration's label instead of a user object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Sender {
    User { id: Value, name: String },
    Label(String),
}

impl Message {
    pub fn from_item(item: &Value) -> Option<Self> {
        let item = HistoryItem::deserialize(item).ok()?;
        match item.kind.as_deref() {
            None | Some("message") | Some("notification") => {}
            Some(_) => return None,
        }
        let (sender_name, sender_id) = match item.from? {
            Sender::User { id, name } => {
                let id = match id {
                    Value::String(id) => id,
                    other => other.to_string(),
                };
                (name, id)
            }
            Sender::Label(label) => (label.clone(), label),
        };
        Some(Self {
            sender_name,
            sender_id,
            text: item.message.unwrap_or_default(),
            is_card: item.card.is_some_and(|card| !card.is_null()),
        })
    }
}

pub fn unread_history_path(base: &str, since_mid: &str) -> String {
    format!("{base}?not-before={since_mid}")
}

pub fn full_history_path(base: &str) -> String {
    format!("{base}?max-results=1000")
}
