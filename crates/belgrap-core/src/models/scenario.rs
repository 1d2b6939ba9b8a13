//! Scenario model
//!
//! Administrator-managed catalog of scripted call scenarios. Each scenario is
//! linked to an agent at the voice provider; a scenario without an agent
//! cannot be called.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scenario entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique slug identifier (e.g. `pizza-bezorging`)
    pub id: String,

    /// Display name
    pub name: String,

    /// Short description shown in the catalog
    pub description: String,

    /// Emoji or icon identifier
    pub icon: Option<String>,

    /// Catalog image URL
    pub image_url: Option<String>,

    /// Category label
    pub category: Option<String>,

    /// Difficulty label
    pub difficulty: Option<String>,

    /// Expected duration label (e.g. "2-3 min")
    pub duration_label: Option<String>,

    /// Script text the agent improvises around
    pub script: String,

    /// Optional audio configuration (voice, background sounds)
    pub audio_config: Option<serde_json::Value>,

    /// Linked agent id at the voice provider; must be non-empty for end users
    pub assistant_id: String,

    /// Whether the scenario is enabled
    pub active: bool,

    /// Whether the scenario appears in the public catalog
    pub public: bool,

    /// Times a call completed using this scenario
    pub times_used: i64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Scenario {
    /// Check whether end users can start a call with this scenario
    pub fn is_callable(&self) -> bool {
        self.active && !self.assistant_id.is_empty()
    }
}

impl Default for Scenario {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            icon: None,
            image_url: None,
            category: None,
            difficulty: None,
            duration_label: None,
            script: String::new(),
            audio_config: None,
            assistant_id: String::new(),
            active: true,
            public: true,
            times_used: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callable_requires_agent() {
        let scenario = Scenario {
            assistant_id: "agent_123".to_string(),
            ..Default::default()
        };
        assert!(scenario.is_callable());

        let no_agent = Scenario::default();
        assert!(!no_agent.is_callable());

        let inactive = Scenario {
            assistant_id: "agent_123".to_string(),
            active: false,
            ..Default::default()
        };
        assert!(!inactive.is_callable());
    }
}
