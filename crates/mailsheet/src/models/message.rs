//! Message identifiers and sender parsing

use serde::{Deserialize, Serialize};

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a thread (Gmail thread ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Sender of a message, split into display name and address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// Display name (falls back to the address when the header has none)
    pub name: String,
    /// Email address, empty when the header carries no address at all
    pub email: String,
}

impl Sender {
    /// Parse a raw `From` header value like `"Jane Doe" <jane@example.com>`
    ///
    /// Only the first entry of a comma-separated list is considered.
    pub fn parse(raw: &str) -> Self {
        let first = raw.split(',').next().unwrap_or_default().trim();
        if first.is_empty() {
            return Self::default();
        }

        // "Name <email>" with the closing bracket at the very end
        if first.ends_with('>')
            && let Some(angle_start) = first.rfind('<')
        {
            let email = first[angle_start + 1..first.len() - 1].trim();
            if !email.is_empty() && !email.contains('>') {
                let name = strip_quotes(first[..angle_start].trim());
                return Self {
                    name: if name.is_empty() {
                        email.to_string()
                    } else {
                        name.to_string()
                    },
                    email: email.to_string(),
                };
            }
        }

        if first.contains('@') {
            return Self {
                name: first.to_string(),
                email: first.to_string(),
            };
        }

        Self {
            name: first.to_string(),
            email: String::new(),
        }
    }
}

fn strip_quotes(s: &str) -> &str {
    let s = s.strip_prefix('"').unwrap_or(s);
    s.strip_suffix('"').unwrap_or(s)
}
