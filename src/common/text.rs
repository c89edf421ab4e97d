//! Text helpers for diagnostics and Discord replies.

/// Maximum length of a Discord message.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Maximum number of characters of an HTTP body kept in error messages.
pub const DIAGNOSTIC_BODY_LIMIT: usize = 500;

/// Truncate `text` to at most `max_chars` characters, appending `…` when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}
