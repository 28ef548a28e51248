use crate::modality::Modality;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Plan used for anonymous sessions and for any plan name missing from the table.
pub const DEFAULT_PLAN: &str = "Free";

const FREE_LIMITS: PlanLimits = PlanLimits {
    video: 1,
    image: 3,
    audio: 3,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanLimits {
    pub video: u32,
    pub image: u32,
    pub audio: u32,
}

impl PlanLimits {
    pub fn get(&self, modality: Modality) -> u32 {
        match modality {
            Modality::Video => self.video,
            Modality::Image => self.image,
            Modality::Audio => self.audio,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlanTableError {
    #[error("Plan table has no \"{DEFAULT_PLAN}\" entry")]
    MissingDefaultPlan,
    #[error("Plan {plan} has a zero {modality} limit")]
    ZeroLimit { plan: String, modality: Modality },
}

/// Immutable mapping from plan name to per-modality quotas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PlanTable {
    plans: BTreeMap<String, PlanLimits>,
}

impl Default for PlanTable {
    fn default() -> Self {
        let plans = [
            (DEFAULT_PLAN, FREE_LIMITS),
            (
                "Starter",
                PlanLimits {
                    video: 5,
                    image: 50,
                    audio: 20,
                },
            ),
            (
                "Pro",
                PlanLimits {
                    video: 30,
                    image: 200,
                    audio: 100,
                },
            ),
            (
                "Enterprise",
                PlanLimits {
                    video: 1000,
                    image: 10_000,
                    audio: 5000,
                },
            ),
        ];
        Self {
            plans: plans
                .into_iter()
                .map(|(name, limits)| (name.to_string(), limits))
                .collect(),
        }
    }
}

impl PlanTable {
    pub fn empty() -> Self {
        Self {
            plans: BTreeMap::new(),
        }
    }

    pub fn with_plan(mut self, name: impl Into<String>, limits: PlanLimits) -> Self {
        self.plans.insert(name.into(), limits);
        self
    }

    pub fn get(&self, plan: &str) -> Option<&PlanLimits> {
        self.plans.get(plan)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlanLimits)> {
        self.plans.iter().map(|(name, limits)| (name.as_str(), limits))
    }

    /// Returns the effective plan name and its limits, falling back to
    /// the default plan for `None` or unknown names.
    pub fn resolve<'a>(&'a self, plan: Option<&'a str>) -> (&'a str, PlanLimits) {
        if let Some((name, limits)) = plan.and_then(|p| self.plans.get_key_value(p)) {
            return (name.as_str(), *limits);
        }
        let limits = self.plans.get(DEFAULT_PLAN).copied().unwrap_or(FREE_LIMITS);
        (DEFAULT_PLAN, limits)
    }

    /// Entries in `overrides` replace same-named plans; other plans are kept.
    pub fn merged_with(mut self, overrides: &PlanTable) -> Self {
        for (name, limits) in &overrides.plans {
            self.plans.insert(name.clone(), *limits);
        }
        self
    }

    pub fn validate(&self) -> Result<(), PlanTableError> {
        if !self.plans.contains_key(DEFAULT_PLAN) {
            return Err(PlanTableError::MissingDefaultPlan);
        }
        for (name, limits) in &self.plans {
            for modality in Modality::all() {
                if limits.get(modality) == 0 {
                    return Err(PlanTableError::ZeroLimit {
                        plan: name.clone(),
                        modality,
                    });
                }
            }
        }
        Ok(())
    }
}
