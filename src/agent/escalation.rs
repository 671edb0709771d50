// HR escalation hierarchy
//
// Customer -> State Manager -> Regional Manager -> Segment Manager ->
// Category Manager -> LOB/Executive

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    StateManager,
    RegionalManager,
    SegmentManager,
    CategoryManager,
    Executive,
}

#[derive(Debug, Error, PartialEq)]
#[error(
    "Unknown role '{0}'. Expected one of: Customer, State Manager, Regional Manager, \
     Segment Manager, Category Manager, Executive"
)]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Customer,
        Role::StateManager,
        Role::RegionalManager,
        Role::SegmentManager,
        Role::CategoryManager,
        Role::Executive,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Role::Customer => "Customer",
            Role::StateManager => "State Manager",
            Role::RegionalManager => "Regional Manager",
            Role::SegmentManager => "Segment Manager",
            Role::CategoryManager => "Category Manager",
            Role::Executive => "LOB/Executive",
        }
    }

    /// Next role up, `None` at the top of the hierarchy
    pub fn escalates_to(&self) -> Option<Role> {
        match self {
            Role::Customer => Some(Role::StateManager),
            Role::StateManager => Some(Role::RegionalManager),
            Role::RegionalManager => Some(Role::SegmentManager),
            Role::SegmentManager => Some(Role::CategoryManager),
            Role::CategoryManager => Some(Role::Executive),
            Role::Executive => None,
        }
    }

    /// Table listing people who hold this role, if the database has one
    pub fn manager_table(&self) -> Option<&'static str> {
        match self {
            Role::StateManager => Some("state_managers"),
            Role::RegionalManager => Some("regional_managers"),
            Role::SegmentManager => Some("segment_managers"),
            Role::CategoryManager => Some("category_managers"),
            Role::Customer | Role::Executive => None,
        }
    }

    /// Column of the manager table used to find the right manager
    pub fn lookup_key(&self) -> Option<&'static str> {
        match self {
            Role::StateManager => Some("State"),
            Role::RegionalManager => Some("Region"),
            Role::SegmentManager => Some("Segment"),
            Role::CategoryManager => Some("Category"),
            Role::Customer | Role::Executive => None,
        }
    }

    /// Roles from `self` up to the top, excluding `self`
    pub fn chain(&self) -> Vec<Role> {
        std::iter::successors(self.escalates_to(), Role::escalates_to).collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    /// Accepts labels and identifiers: "State Manager", "state_manager",
    /// "state-manager", "STATE MANAGER", "lob", "executive".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "customer" => Ok(Role::Customer),
            "statemanager" | "state" => Ok(Role::StateManager),
            "regionalmanager" | "regional" => Ok(Role::RegionalManager),
            "segmentmanager" | "segment" => Ok(Role::SegmentManager),
            "categorymanager" | "category" => Ok(Role::CategoryManager),
            "executive" | "lob" | "lobexecutive" => Ok(Role::Executive),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Escalation form submitted by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRequest {
    pub name: String,
    pub role: Role,
    pub state: Option<String>,
    pub issue: String,
}

impl EscalationRequest {
    /// Structured task text handed to the agent
    pub fn to_task(&self) -> String {
        let state = self
            .state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("N/A");
        let target = match self.role.escalates_to() {
            Some(next) => next.label(),
            None => "none (already at the top of the hierarchy)",
        };

        format!(
            "User Details:\n\
             - Name: {}\n\
             - Role: {}\n\
             - State: {}\n\
             - Issue: {}\n\
             \n\
             Expected escalation level: {}\n\
             \n\
             Task:\n\
             - Identify escalation target (manager role + name) using DB + hierarchy.\n\
             - Recommend escalation path.\n\
             - Draft escalation email.",
            self.name.trim(),
            self.role,
            state,
            self.issue.trim(),
            target
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_reaches_executive_in_five_steps() {
        let chain = Role::Customer.chain();
        assert_eq!(chain.len(), 5);
        assert_eq!(chain.first(), Some(&Role::StateManager));
        assert_eq!(chain.last(), Some(&Role::Executive));
        assert!(Role::Executive.chain().is_empty());
    }

    #[test]
    fn test_every_role_but_executive_escalates() {
        for role in Role::ALL {
            assert_eq!(role.escalates_to().is_none(), role == Role::Executive);
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("State Manager".parse::<Role>(), Ok(Role::StateManager));
        assert_eq!("regional_manager".parse::<Role>(), Ok(Role::RegionalManager));
        assert_eq!("LOB/Executive".parse::<Role>(), Ok(Role::Executive));
        assert_eq!(" customer ".parse::<Role>(), Ok(Role::Customer));
        assert!("intern".parse::<Role>().is_err());
    }

    #[test]
    fn test_manager_tables() {
        let table = |role: Role| role.escalates_to().and_then(|r| r.manager_table());
        assert_eq!(table(Role::Customer), Some("state_managers"));
        assert_eq!(table(Role::CategoryManager), None);
    }

    #[test]
    fn test_task_text() {
        let request = EscalationRequest {
            name: "Dana".to_string(),
            role: Role::Customer,
            state: Some("Texas".to_string()),
            issue: "Late delivery".to_string(),
        };
        let task = request.to_task();
        assert!(task.contains("- Role: Customer"));
        assert!(task.contains("- State: Texas"));
        assert!(task.contains("Expected escalation level: State Manager"));

        let no_state = EscalationRequest {
            state: None,
            ..request
        };
        assert!(no_state.to_task().contains("- State: N/A"));
    }
}
