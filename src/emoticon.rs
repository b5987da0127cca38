use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use serde::Deserialize;

use crate::api::{ApiClient, ApiError, PageSource};
use crate::error::CommandError;
use crate::output::{self, Emphasis};
use crate::pager::traverse;

pub const EMOTICONS_PATH: &str = "emoticon?max-results=1000&type=all";
pub const MAX_IMAGE_BYTES: u64 = 1024 * 1024;

// Group uploads live under a numeric group directory.
static CUSTOM_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/emoticons/\d+/").expect("custom emoticon pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Emoticon {
    pub id: i64,
    pub shortcut: String,
    pub url: String,
}

impl Emoticon {
    pub fn is_custom(&self) -> bool {
        CUSTOM_URL.is_match(&self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub emoticon: Emoticon,
    pub shadows_builtin: bool,
}

pub fn normalize_shortcut(name: &str) -> &str {
    name.trim().trim_start_matches('(').trim_end_matches(')')
}

pub fn find<S: PageSource + ?Sized>(source: &S, name: &str) -> Result<Option<Lookup>, ApiError> {
    let shortcut = normalize_shortcut(name);
    let mut matches = Vec::new();
    for item in traverse(source, EMOTICONS_PATH) {
        let item = item?;
        match serde_json::from_value::<Emoticon>(item) {
            Ok(emoticon) if emoticon.shortcut == shortcut => matches.push(emoticon),
            Ok(_) => {}
            Err(err) => tracing::debug!(%err, "skipping malformed emoticon"),
        }
    }

    let builtin_exists = matches.iter().any(|emoticon| !emoticon.is_custom());
    let chosen = matches
        .iter()
        .find(|emoticon| emoticon.is_custom())
        .or_else(|| matches.first())
        .cloned();
    Ok(chosen.map(|emoticon| Lookup {
        shadows_builtin: emoticon.is_custom() && builtin_exists,
        emoticon,
    }))
}

/// iTerm2 inline image escape sequence.
pub fn inline_image(name: &str, bytes: &[u8]) -> String {
    format!(
        "\u{1b}]1337;File=name={};size={};inline=1:{}\u{7}",
        STANDARD.encode(name),
        bytes.len(),
        STANDARD.encode(bytes)
    )
}

pub fn show(api: &ApiClient, name: &str, emphasis: Emphasis) -> Result<(), CommandError> {
    let Some(lookup) = find(api, name)? else {
        return Err(CommandError::NotFound(format!(
            "No emoticon named ({}).",
            normalize_shortcut(name)
        )));
    };
    let emoticon = &lookup.emoticon;

    println!("{}", emphasis.heading(&format!("({})", emoticon.shortcut)));
    let kind = match (emoticon.is_custom(), lookup.shadows_builtin) {
        (true, true) => "custom (shadows a built-in emoticon)",
        (true, false) => "custom",
        (false, _) => "built-in",
    };
    output::print_fields(&[
        ("id", emoticon.id.to_string()),
        ("kind", kind.to_string()),
        ("url", emoticon.url.clone()),
    ]);

    match api.download(&emoticon.url, MAX_IMAGE_BYTES) {
        Ok(bytes) => {
            if console::Term::stdout().is_term() {
                println!("{}", inline_image(&emoticon.shortcut, &bytes));
            } else {
                println!("image  {}", output::format_bytes(bytes.len() as u64));
            }
        }
        Err(ApiError::SizeExceeded { limit, .. }) => {
            eprintln!("Image not shown: larger than {}.", output::format_bytes(limit));
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}
