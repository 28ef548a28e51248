pub mod content;
pub mod modality;
pub mod plans;
pub mod recorder;
pub mod tracker;
pub mod user;

pub use content::{GeneratedContent, GeneratedMedia, Voice};
pub use modality::{Modality, ParseError, UsageCounters};
pub use plans::{PlanLimits, PlanTable, PlanTableError, DEFAULT_PLAN};
pub use recorder::record;
pub use tracker::{snapshot, snapshot_all, UsageSnapshot};
pub use user::User;
