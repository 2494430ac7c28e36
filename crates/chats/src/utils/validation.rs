//! Validation utilities.

use crate::types::{ChatError, ChatResult};

const MAX_GROUP_NAME_CHARS: usize = 255;
const MAX_MESSAGE_CHARS: usize = 100_000;
const MAX_FILE_NAME_CHARS: usize = 255;

/// Validation utilities
pub struct Validator;

impl Validator {
    /// Validate a group name and return it trimmed.
    pub fn group_name(name: &str) -> ChatResult<String> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(ChatError::validation("Group name is required"));
        }

        if trimmed.chars().count() > MAX_GROUP_NAME_CHARS {
            return Err(ChatError::validation(format!(
                "Group name too long (max {MAX_GROUP_NAME_CHARS} characters)"
            )));
        }

        Ok(trimmed.to_string())
    }

    /// Normalize message text. Whitespace-only content counts as absent.
    pub fn message_content(content: Option<&str>) -> ChatResult<Option<String>> {
        let Some(trimmed) = content.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(None);
        };

        if trimmed.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ChatError::validation(
                "Message content too long (max 100,000 characters)",
            ));
        }

        Ok(Some(trimmed.to_string()))
    }

    /// A message must carry text, an attachment, or both.
    pub fn message_payload(content: Option<&str>, attachment_count: usize) -> ChatResult<()> {
        if content.is_none() && attachment_count == 0 {
            return Err(ChatError::validation(
                "Message content or attachment is required",
            ));
        }
        Ok(())
    }

    /// Validate an attachment file name
    pub fn file_name(file_name: &str) -> ChatResult<()> {
        if file_name.trim().is_empty() {
            return Err(ChatError::attachment("File name cannot be empty"));
        }

        if file_name.chars().count() > MAX_FILE_NAME_CHARS {
            return Err(ChatError::attachment(
                "File name too long (max 255 characters)",
            ));
        }

        let invalid_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\0'];
        if let Some(found) = invalid_chars.iter().find(|c| file_name.contains(**c)) {
            return Err(ChatError::attachment(format!(
                "File name contains invalid character: {found:?}"
            )));
        }

        Ok(())
    }

    /// Validate an attachment size in bytes
    pub fn file_size(size_bytes: u64, max_size_bytes: u64) -> ChatResult<()> {
        if size_bytes == 0 {
            return Err(ChatError::attachment("Attachment is empty"));
        }

        if size_bytes > max_size_bytes {
            return Err(ChatError::attachment(format!(
                "Attachment too large ({size_bytes} bytes, max {max_size_bytes})"
            )));
        }

        Ok(())
    }
}
