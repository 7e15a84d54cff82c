use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Slot a strategy occupies in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyRole {
    Primary,
    Fallback,
}

impl fmt::Display for StrategyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// Caller's choice of strategy for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategySelector {
    /// Primary only, no fallback.
    Primary,
    /// Fallback only.
    Fallback,
    /// Prefer primary, switch to fallback on disablement or failure.
    #[default]
    Auto,
}

impl StrategySelector {
    pub fn initial_role(&self) -> StrategyRole {
        match self {
            Self::Primary | Self::Auto => StrategyRole::Primary,
            Self::Fallback => StrategyRole::Fallback,
        }
    }

    pub fn fallback_enabled(&self) -> bool {
        match self {
            Self::Primary => false,
            Self::Fallback | Self::Auto => true,
        }
    }
}

impl fmt::Display for StrategySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Fallback => f.write_str("fallback"),
            Self::Auto => f.write_str("auto"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy selector {0:?}, expected one of: auto, primary, fallback")]
pub struct UnknownSelector(pub String);

impl FromStr for StrategySelector {
    type Err = UnknownSelector;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "fallback" => Ok(Self::Fallback),
            "auto" => Ok(Self::Auto),
            _ => Err(UnknownSelector(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_maps_to_role_and_fallback() {
        assert_eq!(StrategySelector::Auto.initial_role(), StrategyRole::Primary);
        assert!(StrategySelector::Auto.fallback_enabled());

        assert_eq!(StrategySelector::Primary.initial_role(), StrategyRole::Primary);
        assert!(!StrategySelector::Primary.fallback_enabled());

        assert_eq!(StrategySelector::Fallback.initial_role(), StrategyRole::Fallback);
        assert!(StrategySelector::Fallback.fallback_enabled());
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Auto".parse(), Ok(StrategySelector::Auto));
        assert_eq!(" fallback ".parse(), Ok(StrategySelector::Fallback));
        assert!("gps".parse::<StrategySelector>().is_err());
    }
}
