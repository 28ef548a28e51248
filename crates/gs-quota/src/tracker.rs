use crate::modality::Modality;
use crate::plans::PlanTable;
use crate::user::User;
use serde::Serialize;

/// Derived quota view for one (user, modality) pair. Never stored.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UsageSnapshot {
    pub plan: String,
    pub modality: Modality,
    pub limit: u32,
    pub used: u32,
    pub remaining: u32,
    /// Share of the quota consumed, clamped to `0.0..=100.0`.
    pub percentage: f64,
    pub is_limit_reached: bool,
}

/// Computes the quota snapshot for `user` (or an anonymous session) and `modality`.
pub fn snapshot(table: &PlanTable, user: Option<&User>, modality: Modality) -> UsageSnapshot {
    let (plan, limits) = table.resolve(user.map(|u| u.plan.as_str()));
    let limit = limits.get(modality);
    let used = user.map(|u| u.usage.get(modality)).unwrap_or(0);

    let percentage = if limit == 0 {
        100.0
    } else {
        (f64::from(used) * 100.0 / f64::from(limit)).min(100.0)
    };

    UsageSnapshot {
        plan: plan.to_string(),
        modality,
        limit,
        used,
        remaining: limit.saturating_sub(used),
        percentage,
        is_limit_reached: used >= limit,
    }
}

pub fn snapshot_all(table: &PlanTable, user: Option<&User>) -> Vec<UsageSnapshot> {
    Modality::all()
        .into_iter()
        .map(|m| snapshot(table, user, m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modality::UsageCounters;

    fn user_on(plan: &str, usage: UsageCounters) -> User {
        let mut user = User::new("T", "t@example.com").with_plan(plan);
        user.usage = usage;
        user
    }

    #[test]
    fn limit_matches_table_for_every_plan_and_modality() {
        let table = PlanTable::default();
        for (plan, limits) in table.iter() {
            let user = user_on(plan, UsageCounters::default());
            for m in Modality::all() {
                let snap = snapshot(&table, Some(&user), m);
                assert_eq!(snap.limit, limits.get(m), "{plan}/{m}");
                assert_eq!(snap.plan, plan);
            }
        }
    }

    #[test]
    fn unknown_plan_uses_free_limits() {
        let table = PlanTable::default();
        let user = user_on("Gold", UsageCounters::default());
        let snap = snapshot(&table, Some(&user), Modality::Image);
        assert_eq!(snap.plan, "Free");
        assert_eq!(snap.limit, 3);
    }

    #[test]
    fn anonymous_snapshot_is_free_and_unused() {
        let snap = snapshot(&PlanTable::default(), None, Modality::Video);
        assert_eq!(snap.plan, "Free");
        assert_eq!(snap.used, 0);
        assert_eq!(snap.remaining, snap.limit);
        assert_eq!(snap.percentage, 0.0);
        assert!(!snap.is_limit_reached);
    }

    #[test]
    fn free_image_at_limit_is_reached() {
        let user = user_on(
            "Free",
            UsageCounters {
                image: 3,
                ..Default::default()
            },
        );
        let snap = snapshot(&PlanTable::default(), Some(&user), Modality::Image);
        assert!(snap.is_limit_reached);
        assert_eq!(snap.remaining, 0);
        assert_eq!(snap.percentage, 100.0);
    }

    #[test]
    fn overuse_is_clamped() {
        let user = user_on(
            "Free",
            UsageCounters {
                audio: 10,
                ..Default::default()
            },
        );
        let snap = snapshot(&PlanTable::default(), Some(&user), Modality::Audio);
        assert_eq!(snap.used, 10);
        assert_eq!(snap.remaining, 0);
        assert_eq!(snap.percentage, 100.0);
        assert!(snap.is_limit_reached);
    }

    #[test]
    fn partial_usage_percentage() {
        let user = user_on(
            "Starter",
            UsageCounters {
                image: 10,
                ..Default::default()
            },
        );
        let snap = snapshot(&PlanTable::default(), Some(&user), Modality::Image);
        assert_eq!(snap.remaining, 40);
        assert!((snap.percentage - 20.0).abs() < f64::EPSILON);
        assert!(!snap.is_limit_reached);
    }

    #[test]
    fn snapshot_all_covers_each_modality() {
        let snaps = snapshot_all(&PlanTable::default(), None);
        let modalities: Vec<_> = snaps.iter().map(|s| s.modality).collect();
        assert_eq!(modalities, Modality::all().to_vec());
    }
}
