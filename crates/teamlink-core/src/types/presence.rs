//! Presence status definitions.

use serde::{Deserialize, Serialize};

/// User presence status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresenceStatus {
    /// Connected and recently active.
    Online,
    /// Connected but idle past the inactivity threshold.
    Away,
    /// Explicitly busy; not demoted by the inactivity sweep.
    Busy,
    /// Explicit do-not-disturb; not demoted by the inactivity sweep.
    DoNotDisturb,
    /// No live connections.
    Offline,
}

impl PresenceStatus {
    /// Parses a status string, returning `None` on unknown input.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "online" => Some(Self::Online),
            "away" => Some(Self::Away),
            "busy" => Some(Self::Busy),
            "dnd" | "donotdisturb" | "do_not_disturb" => Some(Self::DoNotDisturb),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }

    /// Converts to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Away => "Away",
            Self::Busy => "Busy",
            Self::DoNotDisturb => "DoNotDisturb",
            Self::Offline => "Offline",
        }
    }

    /// Explicit user-set states the inactivity sweep leaves alone.
    pub fn is_sticky(&self) -> bool {
        matches!(self, Self::Busy | Self::DoNotDisturb)
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_aliases() {
        assert_eq!(PresenceStatus::parse("DND"), Some(PresenceStatus::DoNotDisturb));
        assert_eq!(
            PresenceStatus::parse("DoNotDisturb"),
            Some(PresenceStatus::DoNotDisturb)
        );
        assert_eq!(PresenceStatus::parse("online"), Some(PresenceStatus::Online));
        assert_eq!(PresenceStatus::parse("sleeping"), None);
    }

    #[test]
    fn test_sticky_states() {
        assert!(PresenceStatus::Busy.is_sticky());
        assert!(PresenceStatus::DoNotDisturb.is_sticky());
        assert!(!PresenceStatus::Online.is_sticky());
        assert!(!PresenceStatus::Away.is_sticky());
    }
}
