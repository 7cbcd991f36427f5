use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person on the other end of the chat.
    Human,
    /// Text generated by the completion provider.
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(Self::Human),
            // Rows written by the first bot deployment used "ai".
            "assistant" | "ai" => Ok(Self::Assistant),
            other => Err(format!("unknown turn role: {other}")),
        }
    }
}

/// Which past turns a persona feeds back into its prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryFilter {
    /// Every turn, human and assistant, in write order.
    #[default]
    All,
    /// Only what the human said.
    HumanOnly,
}

impl HistoryFilter {
    pub fn allows(&self, role: Role) -> bool {
        match self {
            Self::All => true,
            Self::HumanOnly => role == Role::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_stored_form() {
        assert_eq!(Role::Human.to_string(), "human");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn legacy_ai_role_parses_as_assistant() {
        assert_eq!("ai".parse::<Role>().unwrap(), Role::Assistant);
        assert_eq!("assistant".parse::<Role>().unwrap(), Role::Assistant);
        assert_eq!("human".parse::<Role>().unwrap(), Role::Human);
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("system".parse::<Role>().is_err());
        assert!("Human".parse::<Role>().is_err());
    }

    #[test]
    fn human_only_filter_drops_assistant() {
        assert!(HistoryFilter::HumanOnly.allows(Role::Human));
        assert!(!HistoryFilter::HumanOnly.allows(Role::Assistant));
        assert!(HistoryFilter::All.allows(Role::Assistant));
    }

    #[test]
    fn history_filter_config_names() {
        let f: HistoryFilter = serde_json::from_str(r#""human-only""#).unwrap();
        assert_eq!(f, HistoryFilter::HumanOnly);
        let f: HistoryFilter = serde_json::from_str(r#""all""#).unwrap();
        assert_eq!(f, HistoryFilter::All);
    }

    #[test]
    fn serde_uses_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, r#""assistant""#);
    }
}
