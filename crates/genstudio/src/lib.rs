//! Session-level orchestration for genstudio: quota gating, dispatch and
//! history recording around an explicitly passed [`Session`].

pub mod account;
pub mod session;
pub mod studio;

pub use account::{list_price, AccountError, Accounts, Receipt, Registration};
pub use session::Session;
pub use studio::{GenerateError, Generation, Studio};

/// Build-time version string.
pub const STUDIO_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of history entries the profile view shows before "show more".
pub const RECENT_HISTORY_LIMIT: usize = 6;
