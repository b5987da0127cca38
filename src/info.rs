use chrono::{DateTime, Local, Utc};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use serde_json::Value;

use crate::api::{ApiClient, PageSource};
use crate::directory::{DirectoryCache, USERS_PATH};
use crate::error::CommandError;
use crate::output::{self, Emphasis};
use crate::pager::traverse;

#[derive(Debug, Deserialize)]
pub struct RoomDetails {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub xmpp_jid: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub privacy: Option<String>,
    #[serde(default)]
    pub owner: Option<Person>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub last_active: Option<String>,
    #[serde(default)]
    pub participants: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(default)]
    pub mention_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub mention_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_group_admin: bool,
}

pub fn show_room(api: &ApiClient, name: &str, emphasis: Emphasis) -> Result<(), CommandError> {
    let path = format!("room/{}", utf8_percent_encode(name, NON_ALPHANUMERIC));
    let room: RoomDetails = api.get_json(&path)?;

    println!("{}", emphasis.heading(&room.name));
    output::print_fields(&room_fields(&room));
    Ok(())
}

fn room_fields(room: &RoomDetails) -> Vec<(&'static str, String)> {
    let owner = room.owner.as_ref().map(|owner| match owner.mention_name.as_deref() {
        Some(mention) => format!("{} (@{mention})", owner.name),
        None => owner.name.clone(),
    });
    vec![
        ("id", room.id.to_string()),
        ("jid", or_dash(room.xmpp_jid.as_deref())),
        ("topic", or_dash(room.topic.as_deref().filter(|topic| !topic.is_empty()))),
        ("privacy", or_dash(room.privacy.as_deref())),
        ("owner", or_dash(owner.as_deref())),
        ("created", format_date(room.created.as_deref())),
        ("archived", if room.is_archived { "yes" } else { "no" }.to_string()),
        ("last active", format_date(room.last_active.as_deref())),
        ("participants", room.participants.len().to_string()),
    ]
}

pub fn group_admins<S: PageSource + ?Sized>(source: &S) -> Result<Vec<Member>, CommandError> {
    let mut admins = Vec::new();
    for item in traverse(source, USERS_PATH) {
        match serde_json::from_value::<Member>(item?) {
            Ok(member) if member.is_group_admin => admins.push(member),
            Ok(_) => {}
            Err(err) => tracing::debug!(%err, "skipping malformed user"),
        }
    }
    Ok(admins)
}

pub fn show_admins<S: PageSource + ?Sized>(source: &S) -> Result<(), CommandError> {
    let admins = group_admins(source)?;
    if admins.is_empty() {
        println!("No group admins found.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = admins
        .iter()
        .map(|admin| {
            vec![
                admin.id.to_string(),
                admin.name.clone(),
                admin
                    .mention_name
                    .as_deref()
                    .map(|mention| format!("@{mention}"))
                    .unwrap_or_else(|| "-".to_string()),
                or_dash(admin.email.as_deref()),
            ]
        })
        .collect();
    output::print_table(&["id", "name", "mention", "email"], &rows, &[10, 28, 20, 36]);
    Ok(())
}

pub fn show_cache(cache: &DirectoryCache) {
    let fields = match cache.load() {
        Some(directory) => {
            let (rooms, users) = directory.counts();
            vec![
                ("path", cache.path().display().to_string()),
                ("rooms", rooms.to_string()),
                ("users", users.to_string()),
                (
                    "built",
                    output::format_age(directory.timestamp(), Utc::now().timestamp()),
                ),
            ]
        }
        None => vec![
            ("path", cache.path().display().to_string()),
            ("status", "no cache (rebuilt on next unread)".to_string()),
        ],
    };
    output::print_fields(&fields);
}

fn format_date(value: Option<&str>) -> String {
    let Some(value) = value else {
        return "-".to_string();
    };
    match DateTime::parse_from_rfc3339(value) {
        Ok(date) => date.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => value.to_string(),
    }
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}
