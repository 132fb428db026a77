//! # Dispatch Audit Trail
//!
//! Records event receipt, policy invocations, and dispatch halts for
//! operator review. The trail is a bounded buffer that trims the oldest
//! 10% of entries when the configured maximum is exceeded; deployments
//! that need full history persist entries before they age out.

use serde::{Deserialize, Serialize};

use tessera_core::Timestamp;

/// The kind of audit trail event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntryType {
    /// An event entered the dispatcher.
    EventReceived,
    /// A policy ran, by binding match or fan-out.
    PolicyInvoked,
    /// A policy invocation failed.
    PolicyFailed,
    /// A stop-on-error binding halted the rest of a dispatch.
    DispatchHalted,
    /// A policy was invoked directly, without a prior event.
    DirectInvocation,
}

impl AuditEntryType {
    /// The string value used in serialized trails.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EventReceived => "event_received",
            Self::PolicyInvoked => "policy_invoked",
            Self::PolicyFailed => "policy_failed",
            Self::DispatchHalted => "dispatch_halted",
            Self::DirectInvocation => "direct_invocation",
        }
    }
}

impl std::fmt::Display for AuditEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in the dispatch audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// The kind of event recorded.
    pub entry_type: AuditEntryType,
    /// When the entry was recorded.
    pub timestamp: Timestamp,
    /// The policy concerned, when one is.
    pub policy: Option<String>,
    /// Structured detail payload.
    pub details: Option<serde_json::Value>,
}

impl AuditEntry {
    /// An entry stamped with the current time.
    pub fn new(
        entry_type: AuditEntryType,
        policy: Option<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            entry_type,
            timestamp: Timestamp::now(),
            policy,
            details,
        }
    }
}

/// A bounded, append-only audit trail.
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
    max_entries: usize,
}

impl AuditTrail {
    /// A trail holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
        }
    }

    /// Append an entry, trimming the oldest 10% when over capacity.
    pub fn append(&mut self, entry: AuditEntry) {
        self.entries.push(entry);
        if self.entries.len() > self.max_entries {
            let trim_count = (self.max_entries / 10).max(1);
            self.entries.drain(..trim_count);
        }
    }

    /// All retained entries, oldest first.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the trail is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries concerning one policy.
    pub fn entries_for_policy(&self, policy: &str) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.policy.as_deref() == Some(policy))
            .collect()
    }

    /// Entries of one kind.
    pub fn entries_by_type(&self, entry_type: AuditEntryType) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.entry_type == entry_type)
            .collect()
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("entries", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_query() {
        let mut trail = AuditTrail::new(100);
        trail.append(AuditEntry::new(AuditEntryType::EventReceived, None, None));
        trail.append(AuditEntry::new(
            AuditEntryType::PolicyInvoked,
            Some("access_time".into()),
            None,
        ));
        trail.append(AuditEntry::new(
            AuditEntryType::PolicyFailed,
            Some("access_time".into()),
            None,
        ));

        assert_eq!(trail.len(), 3);
        assert_eq!(trail.entries_for_policy("access_time").len(), 2);
        assert_eq!(trail.entries_by_type(AuditEntryType::EventReceived).len(), 1);
    }

    #[test]
    fn trims_oldest_when_over_capacity() {
        let mut trail = AuditTrail::new(10);
        for i in 0..11 {
            trail.append(AuditEntry::new(
                AuditEntryType::PolicyInvoked,
                Some(format!("p{i}")),
                None,
            ));
        }
        assert_eq!(trail.len(), 10);
        assert_eq!(trail.entries()[0].policy.as_deref(), Some("p1"));
    }

    #[test]
    fn entry_type_display() {
        assert_eq!(AuditEntryType::EventReceived.to_string(), "event_received");
        assert_eq!(
            AuditEntryType::DispatchHalted.to_string(),
            "dispatch_halted"
        );
    }
}
