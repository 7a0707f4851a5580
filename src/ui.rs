use colored::Colorize;
use declarative::{ChangeKind, FieldChange};
use serde_json::Value;

/// Fields whose values are never printed
const REDACTED_FIELDS: &[&str] = &["password"];

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Change Display
// ============================================================================

/// Compact one-line rendering of a field value
pub fn format_value(field: &str, value: &Value) -> String {
    if value.is_null() {
        return "(none)".to_string();
    }
    if REDACTED_FIELDS.contains(&field) {
        return "(sensitive)".to_string();
    }
    match value {
        Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

/// `~ field: old → new`, with `+`/`-` for added/removed fields
pub fn change_line(field: &str, change: &FieldChange) -> String {
    let old = format_value(field, &change.old);
    let new = format_value(field, &change.new);
    match change.kind() {
        ChangeKind::Added => format!("+ {field}: {new}"),
        ChangeKind::Removed => format!("- {field}: {old}"),
        ChangeKind::Modified => format!("~ {field}: {old} → {new}"),
    }
}

/// Print a change line, colored by kind
pub fn change(field: &str, change: &FieldChange, destructive: bool) {
    let line = change_line(field, change);
    let line = match change.kind() {
        ChangeKind::Added => line.green(),
        ChangeKind::Removed => line.red(),
        ChangeKind::Modified => line.yellow(),
    };
    if destructive {
        println!("  {line} {}", "(quiesces dependents)".magenta());
    } else {
        println!("  {line}");
    }
}

// ============================================================================
// Tests
// ============================================================================
