//! Simulated sign-in and checkout. Both succeed after a fixed delay; no
//! credentials or card details are processed.

use crate::session::Session;
use gs_config::AuthConfig;
use gs_quota::User;
use serde::Serialize;
use std::time::Duration;

/// Credits granted per currency unit paid.
pub const CREDITS_PER_UNIT: u32 = 10;

const FALLBACK_UPGRADE_PLAN: &str = "Pro";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Email is required")]
    MissingEmail,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Please accept terms and privacy policy")]
    TermsNotAccepted,
    #[error("Amount must be greater than 0")]
    InvalidAmount,
}

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub terms_accepted: bool,
    pub privacy_accepted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub plan: String,
    pub amount: u32,
    pub credits: u32,
}

/// List price of a plan, if it is sold.
pub fn list_price(plan: &str) -> Option<u32> {
    match plan {
        "Starter" => Some(9),
        "Pro" => Some(29),
        "Enterprise" => Some(99),
        _ => None,
    }
}

pub struct Accounts {
    login_delay: Duration,
    payment_delay: Duration,
}

impl Accounts {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            login_delay: config.login_delay(),
            payment_delay: config.payment_delay(),
        }
    }

    pub async fn login(&self, name: &str, email: &str) -> Result<Session, AccountError> {
        if email.trim().is_empty() {
            return Err(AccountError::MissingEmail);
        }
        tokio::time::sleep(self.login_delay).await;
        let user = User::new(name, email);
        tracing::info!("Signed in {} on the {} plan", user.email, user.plan);
        Ok(Session::SignedIn(user))
    }

    pub async fn register(&self, form: &Registration) -> Result<Session, AccountError> {
        if form.password != form.confirm_password {
            return Err(AccountError::PasswordMismatch);
        }
        if !form.terms_accepted || !form.privacy_accepted {
            return Err(AccountError::TermsNotAccepted);
        }
        self.login(&form.name, &form.email).await
    }

    /// Simulates a payment and upgrades a signed-in user's plan. An empty
    /// plan name upgrades to Pro; anonymous sessions only get a receipt.
    pub async fn checkout(
        &self,
        session: Session,
        plan: &str,
        amount: u32,
    ) -> Result<(Session, Receipt), AccountError> {
        if amount == 0 {
            return Err(AccountError::InvalidAmount);
        }
        tokio::time::sleep(self.payment_delay).await;

        let plan = match plan.trim() {
            "" => FALLBACK_UPGRADE_PLAN.to_string(),
            p => p.to_string(),
        };
        let receipt = Receipt {
            plan: plan.clone(),
            amount,
            credits: amount.saturating_mul(CREDITS_PER_UNIT),
        };
        let session = match session {
            Session::SignedIn(user) => {
                tracing::info!("Upgraded {} to {}", user.email, plan);
                Session::SignedIn(user.with_plan(plan))
            }
            anonymous => anonymous,
        };
        Ok((session, receipt))
    }
}
