// src/policy.rs
// Location access rules and the permit/forbid decision engine.

use serde::{Deserialize, Serialize};

use crate::geo::Location;

/// Which location attribute a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    CountryCode,
    ContinentCode,
}

/// Predicate over a location: matches when the selected field equals
/// the two-letter code. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    field: RuleField,
    code: String,
}

impl AccessRule {
    pub fn new(field: RuleField, code: &str) -> Self {
        AccessRule {
            field,
            code: code.trim().to_ascii_uppercase(),
        }
    }

    pub fn matches(&self, location: &Location) -> bool {
        let value = match self.field {
            RuleField::CountryCode => location.country_code.as_deref(),
            RuleField::ContinentCode => location.continent_code.as_deref(),
        };
        value.is_some_and(|v| v.eq_ignore_ascii_case(&self.code))
    }
}

/// Whether matching rules grant or deny access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Permit,
    #[default]
    Forbid,
}

/// An action plus an unordered rule set. An empty rule set always
/// grants, regardless of action.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    action: Action,
    rules: Vec<AccessRule>,
}

impl AccessPolicy {
    pub fn new(action: Action, rules: Vec<AccessRule>) -> Self {
        AccessPolicy { action, rules }
    }

    /// Builds the policy from the configured action and country/territory
    /// code lists.
    pub fn from_config(cfg: &crate::config::Config) -> Self {
        let mut rules = Vec::new();
        for country in &cfg.countries {
            rules.push(AccessRule::new(RuleField::CountryCode, country));
        }
        for territory in &cfg.territories {
            rules.push(AccessRule::new(RuleField::ContinentCode, territory));
        }
        AccessPolicy::new(cfg.action, rules)
    }

    /// True when any rule matches the location; false for an empty set.
    fn accessible(&self, location: &Location) -> bool {
        self.rules.iter().any(|rule| rule.matches(location))
    }

    /// Whether the location is granted access under this policy.
    pub fn grants(&self, location: &Location) -> bool {
        match self.action {
            Action::Permit => self.rules.is_empty() || self.accessible(location),
            Action::Forbid => self.rules.is_empty() || !self.accessible(location),
        }
    }
}
