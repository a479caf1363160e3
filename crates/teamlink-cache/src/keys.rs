//! Side-store key builders.
//!
//! Providers apply their own configured prefix, so keys here are relative.

/// Key of one mirrored pending message.
pub fn pending_message(message_id: &str) -> String {
    format!("pending:msg:{message_id}")
}

/// Pattern matching every mirrored pending message.
pub fn pending_message_pattern() -> String {
    "pending:msg:*".to_string()
}
