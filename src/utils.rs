use chrono::{DateTime, Utc};

/// Format a timestamp for tables and reports.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%d/%m/%Y %H:%M").to_string()
}

/// Short relative date for "last access" columns.
pub fn format_date_short(timestamp: Option<&DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let date = match timestamp {
        Some(dt) => dt,
        None => return "Nunca".to_string(),
    };

    let diff_days = (now - *date).num_days();
    match diff_days {
        0 => "Hoje".to_string(),
        1 => "Ontem".to_string(),
        2..=6 => format!("{} dias atrás", diff_days),
        _ => date.format("%d %b, %Y").to_string(),
    }
}

/// Up to two uppercase initials for the avatar badge; "?" when there is no
/// usable name.
pub fn initials(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() || name == "N/A" {
        return "?".to_string();
    }

    let letters: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .collect();

    letters.to_uppercase().chars().take(2).collect()
}

/// Prompt for yes/no confirmation on destructive commands.
pub fn confirm_action(prompt: &str) -> bool {
    use std::io::{self, Write};

    print!("{} (s/N): ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }

    matches!(input.trim().to_lowercase().as_str(), "s" | "sim" | "y" | "yes")
}

/// Print a formatted table border.
pub fn print_table_border(width: usize) {
    println!("{}", "=".repeat(width));
}

/// Print a table row with fixed column widths.
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    let mut row = String::new();
    for (i, col) in columns.iter().enumerate() {
        if i < widths.len() {
            row.push_str(&format!("{:<width$}  ", col, width = widths[i]));
        }
    }
    println!("{}", row.trim_end());
}
