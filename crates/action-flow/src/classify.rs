//! Message banner classification

use std::fmt;

use serde::{Deserialize, Serialize};

/// Meaning of a message or banner observed after an OTP submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageClassification {
    Invalid,
    Expired,
    Sent,
    Success,
    None,
}

impl MessageClassification {
    /// Invalid or expired code
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            MessageClassification::Invalid | MessageClassification::Expired
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            MessageClassification::Invalid => "invalid",
            MessageClassification::Expired => "expired",
            MessageClassification::Sent => "sent",
            MessageClassification::Success => "success",
            MessageClassification::None => "none",
        }
    }
}

impl fmt::Display for MessageClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One (pattern, classification) row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePattern {
    pub pattern: String,
    pub classification: MessageClassification,
}

impl MessagePattern {
    pub fn new(pattern: impl Into<String>, classification: MessageClassification) -> Self {
        Self {
            pattern: pattern.into(),
            classification,
        }
    }
}

const BUILTIN_PATTERNS: &[(&str, MessageClassification)] = &[
    ("Invalid OTP code", MessageClassification::Invalid),
    ("Kode OTP tidak valid", MessageClassification::Invalid),
    ("OTP has expired", MessageClassification::Expired),
    ("Kode OTP telah kadaluarsa", MessageClassification::Expired),
    ("OTP successfully sent", MessageClassification::Sent),
    ("OTP berhasil dikirim", MessageClassification::Sent),
    ("Verification Complete", MessageClassification::Success),
    ("Verifikasi Selesai", MessageClassification::Success),
];

/// The bilingual messages the host app is known to show.
pub fn builtin_patterns() -> Vec<MessagePattern> {
    BUILTIN_PATTERNS
        .iter()
        .map(|(pattern, classification)| MessagePattern::new(*pattern, *classification))
        .collect()
}

/// Classify `text` against an ordered table.
///
/// Case-insensitive substring match; the first matching row wins.
pub fn classify_with(patterns: &[MessagePattern], text: &str) -> MessageClassification {
    let haystack = text.to_lowercase();
    patterns
        .iter()
        .find(|row| haystack.contains(&row.pattern.to_lowercase()))
        .map(|row| row.classification)
        .unwrap_or(MessageClassification::None)
}
