use crate::content::GeneratedContent;
use crate::modality::UsageCounters;
use crate::plans::DEFAULT_PLAN;
use serde::{Deserialize, Serialize};

const DEFAULT_NAME: &str = "User";

/// A signed-in user, held in memory for the lifetime of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub email: String,
    pub plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub usage: UsageCounters,
    /// Newest entry first.
    #[serde(default)]
    pub history: Vec<GeneratedContent>,
}

impl User {
    /// Fresh user on the default plan with zero usage and no history.
    pub fn new(name: &str, email: &str) -> Self {
        let name = match name.trim() {
            "" => DEFAULT_NAME.to_string(),
            n => n.to_string(),
        };
        Self {
            avatar: Some(avatar_url(&name)),
            name,
            email: email.trim().to_string(),
            plan: DEFAULT_PLAN.to_string(),
            usage: UsageCounters::default(),
            history: Vec::new(),
        }
    }

    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = plan.into();
        self
    }

    pub fn recent_history(&self, limit: usize) -> &[GeneratedContent] {
        &self.history[..self.history.len().min(limit)]
    }
}

fn avatar_url(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=0D8ABC&color=fff",
        name.replace(' ', "+")
    )
}
