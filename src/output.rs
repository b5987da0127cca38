use console::style;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// How emphasis is drawn. ANSI when stdout is a color terminal, bracket
/// markers otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emphasis {
    Ansi,
    Plain,
}

impl Emphasis {
    pub fn detect() -> Self {
        if console::colors_enabled() {
            Emphasis::Ansi
        } else {
            Emphasis::Plain
        }
    }

    pub fn heading(self, text: &str) -> String {
        match self {
            Emphasis::Ansi => style(text).bold().force_styling(true).to_string(),
            Emphasis::Plain => text.to_string(),
        }
    }

    /// Inline replacement marker: `old` struck out, `new` highlighted.
    pub fn replacement(self, old: &str, new: &str) -> String {
        match self {
            Emphasis::Ansi => format!(
                "{}{}",
                style(old).red().strikethrough().force_styling(true),
                style(new).green().bold().force_styling(true)
            ),
            Emphasis::Plain => format!("[-{old}-]{{+{new}+}}"),
        }
    }
}

pub fn print_fields(fields: &[(&str, String)]) {
    let label_width = fields
        .iter()
        .map(|(label, _)| display_width(label))
        .max()
        .unwrap_or(0);
    for (label, value) in fields {
        println!("{}  {}", pad_right(label, label_width), value);
    }
}

pub fn print_table(headers: &[&str], rows: &[Vec<String>], max_widths: &[usize]) {
    let mut widths: Vec<usize> = headers.iter().map(|header| display_width(header)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }
    for (width, max) in widths.iter_mut().zip(max_widths) {
        *width = (*width).min(*max);
    }

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| pad_right(header, *width))
        .collect();
    println!("{}", header_line.join("  ").trim_end());
    for row in rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| pad_right(&truncate_display(cell, *width), *width))
            .collect();
        println!("{}", line.join("  ").trim_end());
    }
}

/// Age of a snapshot built at `built_at`, in the largest whole unit up to days.
pub fn format_age(built_at: i64, now: i64) -> String {
    if built_at <= 0 {
        return "-".to_string();
    }
    let age = (now - built_at).max(0);
    match age {
        0..60 => "just now".to_string(),
        60..3600 => format!("{}m ago", age / 60),
        3600..86400 => format!("{}h ago", age / 3600),
        _ => format!("{}d ago", age / 86400),
    }
}

pub fn format_bytes(bytes: u64) -> String {
    let bytes = bytes as f64;
    if bytes < 1024.0 {
        return format!("{}B", bytes as u64);
    }
    let kb = bytes / 1024.0;
    if kb < 1024.0 {
        return format!("{kb:.1}KB");
    }
    format!("{:.1}MB", kb / 1024.0)
}

fn display_width(value: &str) -> usize {
    UnicodeWidthStr::width(value)
}

fn truncate_display(value: &str, max_width: usize) -> String {
    if display_width(value) <= max_width {
        return value.to_string();
    }
    let ellipsis = "...";
    let mut width = 0usize;
    let mut output = String::new();
    for ch in value.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width + ellipsis.len() > max_width {
            break;
        }
        output.push(ch);
        width += ch_width;
    }
    output.push_str(ellipsis);
    output
}

fn pad_right(value: &str, width: usize) -> String {
    let mut output = value.to_string();
    let current = display_width(value);
    if current < width {
        output.push_str(&" ".repeat(width - current));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_replacement_uses_word_diff_markers() {
        assert_eq!(Emphasis::Plain.replacement("teh", "the"), "[-teh-]{+the+}");
        assert_eq!(Emphasis::Plain.heading("Ops"), "Ops");
    }

    #[test]
    fn ansi_replacement_keeps_both_sides() {
        let rendered = Emphasis::Ansi.replacement("teh", "the");
        assert!(rendered.contains("teh"));
        assert!(rendered.contains("the"));
        assert!(rendered.contains("\u{1b}["));
    }

    #[test]
    fn snapshot_ages() {
        assert_eq!(format_age(1_000, 1_005), "just now");
        assert_eq!(format_age(1_000, 1_000 + 150), "2m ago");
        assert_eq!(format_age(1_000, 1_000 + 3 * 3600), "3h ago");
        assert_eq!(format_age(1_000, 1_000 + 9 * 86400), "9d ago");
        assert_eq!(format_age(1_000 + 120, 1_000), "just now");
        assert_eq!(format_age(0, 1_000), "-");
    }

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(truncate_display("general-chatter", 10), "general...");
        assert_eq!(truncate_display("ops", 10), "ops");
        assert_eq!(pad_right("ops", 5), "ops  ");
    }

    #[test]
    fn byte_sizes() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2.0KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0MB");
    }
}
