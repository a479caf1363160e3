//! Frame and message validation rules.

use teamlink_core::error::AppError;

/// Maximum group name length.
const MAX_GROUP_NAME_LEN: usize = 128;

/// Validates a raw inbound frame before parsing.
pub fn validate_inbound(raw: &str, max_frame_bytes: usize) -> Result<(), AppError> {
    if raw.len() > max_frame_bytes {
        return Err(AppError::validation(format!(
            "Frame exceeds maximum size of {max_frame_bytes} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty frame"));
    }

    Ok(())
}

/// Validates the addressing and body of a message send.
pub fn validate_message(from: &str, to: &str, content: &str) -> Result<(), AppError> {
    if from.trim().is_empty() {
        return Err(AppError::validation("Sender is required"));
    }
    if to.trim().is_empty() {
        return Err(AppError::validation("Recipient is required"));
    }
    if content.trim().is_empty() {
        return Err(AppError::validation("Message content is required"));
    }
    Ok(())
}

/// Validates group name format.
pub fn validate_group_name(group: &str) -> Result<(), AppError> {
    if group.is_empty() || group.len() > MAX_GROUP_NAME_LEN {
        return Err(AppError::validation("Invalid group name length"));
    }

    if !group
        .chars()
        .all(|c| c.is_alphanumeric() || c == ':' || c == '-' || c == '_' || c == '.')
    {
        return Err(AppError::validation("Group name contains invalid characters"));
    }

    Ok(())
}
