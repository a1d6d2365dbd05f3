//! Persisted sync cursors

use serde::{Deserialize, Serialize};

/// Cursors that must survive across invocations
///
/// The three cursors are independent:
/// - `fullscan_page_token` is set while a full scan is paused and cleared
///   when it completes or is reset.
/// - `history_id` and `last_seen_ts` only move forward; they are reset only
///   by [`SyncCheckpoint::cleared`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCheckpoint {
    /// Page token of the next full-scan page to process
    pub fullscan_page_token: Option<String>,
    /// Last known Gmail historyId
    pub history_id: Option<String>,
    /// Highest message timestamp (epoch ms) seen by the fallback listing
    pub last_seen_ts: i64,
}

impl SyncCheckpoint {
    /// A checkpoint with every cursor cleared
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Whether a full scan was interrupted and should resume
    pub fn is_scan_in_progress(&self) -> bool {
        self.fullscan_page_token.is_some()
    }

    /// Record the next page to process (or completion when `None`)
    pub fn with_page_token(mut self, token: Option<String>) -> Self {
        self.fullscan_page_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Advance the change-log position; older or unparseable positions are ignored
    pub fn advance_history(mut self, history_id: impl Into<String>) -> Self {
        let candidate = history_id.into();
        let newer = match (&self.history_id, candidate.parse::<u64>()) {
            (Some(current), Ok(next)) => current.parse::<u64>().map_or(true, |cur| next > cur),
            (None, _) => true,
            (Some(_), Err(_)) => false,
        };
        if newer && !candidate.is_empty() {
            self.history_id = Some(candidate);
        }
        self
    }

    /// Advance the fallback timestamp cursor (never moves backwards)
    pub fn advance_last_seen(mut self, ts: i64) -> Self {
        self.last_seen_ts = self.last_seen_ts.max(ts);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_token_empty_is_cleared() {
        let cp = SyncCheckpoint::default().with_page_token(Some(String::new()));
        assert!(!cp.is_scan_in_progress());

        let cp = cp.with_page_token(Some("p2".into()));
        assert_eq!(cp.fullscan_page_token.as_deref(), Some("p2"));
    }

    #[test]
    fn test_history_only_advances() {
        let cp = SyncCheckpoint::default().advance_history("100");
        assert_eq!(cp.history_id.as_deref(), Some("100"));

        let cp = cp.advance_history("90");
        assert_eq!(cp.history_id.as_deref(), Some("100"));

        let cp = cp.advance_history("150");
        assert_eq!(cp.history_id.as_deref(), Some("150"));
    }

    #[test]
    fn test_last_seen_monotonic() {
        let cp = [100, 50, 200]
            .into_iter()
            .fold(SyncCheckpoint::default(), |cp, ts| cp.advance_last_seen(ts));
        assert_eq!(cp.last_seen_ts, 200);
    }

    #[test]
    fn test_serialization() {
        let cp = SyncCheckpoint {
            fullscan_page_token: Some("abc".into()),
            history_id: Some("12345".into()),
            last_seen_ts: 42,
        };
        let json = serde_json::to_string(&cp).unwrap();
        let back: SyncCheckpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(cp, back);
    }
}
