//! Scenario DTOs
//!
//! Catalog views plus the admin CRUD requests.

use belgrap_core::models::Scenario;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Public catalog view of a scenario
///
/// The script and agent linkage are internal; the catalog only shows what a
/// user needs to pick a scenario. Deserialize is derived because the catalog
/// round-trips through the Redis cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub duration_label: Option<String>,
    pub times_used: i64,
}

impl From<Scenario> for ScenarioResponse {
    fn from(scenario: Scenario) -> Self {
        Self {
            id: scenario.id,
            name: scenario.name,
            description: scenario.description,
            icon: scenario.icon,
            image_url: scenario.image_url,
            category: scenario.category,
            difficulty: scenario.difficulty,
            duration_label: scenario.duration_label,
            times_used: scenario.times_used,
        }
    }
}

/// Full admin view of a scenario
#[derive(Debug, Clone, Serialize)]
pub struct AdminScenarioResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub duration_label: Option<String>,
    pub script: String,
    pub audio_config: Option<serde_json::Value>,
    pub assistant_id: String,
    pub active: bool,
    pub public: bool,
    pub times_used: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Scenario> for AdminScenarioResponse {
    fn from(scenario: Scenario) -> Self {
        Self {
            id: scenario.id,
            name: scenario.name,
            description: scenario.description,
            icon: scenario.icon,
            image_url: scenario.image_url,
            category: scenario.category,
            difficulty: scenario.difficulty,
            duration_label: scenario.duration_label,
            script: scenario.script,
            audio_config: scenario.audio_config,
            assistant_id: scenario.assistant_id,
            active: scenario.active,
            public: scenario.public,
            times_used: scenario.times_used,
            created_at: scenario.created_at,
            updated_at: scenario.updated_at,
        }
    }
}

/// Admin request to create a scenario
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ScenarioCreateRequest {
    /// Slug identifier
    #[validate(length(min = 1, max = 100, message = "Scenario id is required"))]
    pub id: String,

    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub icon: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub duration_label: Option<String>,

    #[serde(default)]
    pub script: String,

    pub audio_config: Option<serde_json::Value>,

    /// Linked agent id; empty means not yet callable
    #[serde(default)]
    pub assistant_id: String,

    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default = "default_true")]
    pub public: bool,
}

fn default_true() -> bool {
    true
}

impl ScenarioCreateRequest {
    /// Build the scenario entity
    pub fn into_scenario(self) -> Scenario {
        Scenario {
            id: self.id,
            name: self.name,
            description: self.description,
            icon: self.icon,
            image_url: self.image_url,
            category: self.category,
            difficulty: self.difficulty,
            duration_label: self.duration_label,
            script: self.script,
            audio_config: self.audio_config,
            assistant_id: self.assistant_id,
            active: self.active,
            public: self.public,
            ..Default::default()
        }
    }
}

/// Admin request to update a scenario; absent fields stay unchanged
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ScenarioUpdateRequest {
    #[validate(length(min = 1, max = 200, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub duration_label: Option<String>,
    pub script: Option<String>,
    pub audio_config: Option<serde_json::Value>,
    pub assistant_id: Option<String>,
    pub active: Option<bool>,
    pub public: Option<bool>,
}

impl ScenarioUpdateRequest {
    /// Apply the present fields onto an existing scenario
    pub fn apply_to(self, scenario: &mut Scenario) {
        if let Some(name) = self.name {
            scenario.name = name;
        }
        if let Some(description) = self.description {
            scenario.description = description;
        }
        if self.icon.is_some() {
            scenario.icon = self.icon;
        }
        if self.image_url.is_some() {
            scenario.image_url = self.image_url;
        }
        if self.category.is_some() {
            scenario.category = self.category;
        }
        if self.difficulty.is_some() {
            scenario.difficulty = self.difficulty;
        }
        if self.duration_label.is_some() {
            scenario.duration_label = self.duration_label;
        }
        if let Some(script) = self.script {
            scenario.script = script;
        }
        if self.audio_config.is_some() {
            scenario.audio_config = self.audio_config;
        }
        if let Some(assistant_id) = self.assistant_id {
            scenario.assistant_id = assistant_id;
        }
        if let Some(active) = self.active {
            scenario.active = active;
        }
        if let Some(public) = self.public {
            scenario.public = public;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_view_hides_script_and_agent() {
        let mut scenario = Scenario::default();
        scenario.id = "pizza".to_string();
        scenario.script = "super geheim script".to_string();
        scenario.assistant_id = "agent_77".to_string();

        let response = ScenarioResponse::from(scenario);
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("geheim"));
        assert!(!json.contains("agent_77"));
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let mut scenario = Scenario {
            id: "pizza".to_string(),
            name: "Pizza".to_string(),
            script: "origineel".to_string(),
            ..Default::default()
        };

        let update = ScenarioUpdateRequest {
            name: Some("Pizza bezorging".to_string()),
            description: None,
            icon: None,
            image_url: None,
            category: None,
            difficulty: None,
            duration_label: None,
            script: None,
            audio_config: None,
            assistant_id: Some("agent_1".to_string()),
            active: Some(false),
            public: None,
        };

        update.apply_to(&mut scenario);
        assert_eq!(scenario.name, "Pizza bezorging");
        assert_eq!(scenario.script, "origineel");
        assert_eq!(scenario.assistant_id, "agent_1");
        assert!(!scenario.active);
        assert!(scenario.public);
    }
}
