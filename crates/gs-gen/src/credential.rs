use async_trait::async_trait;
use std::io::{BufRead, Write};
use std::sync::{Arc, RwLock};

/// Host-side capability for checking and interactively acquiring the
/// upstream credential.
#[async_trait]
pub trait CredentialHost: Send + Sync {
    async fn has_credential(&self) -> bool;
    /// Runs the acquisition flow. The user may dismiss it without choosing anything.
    async fn request_credential_selection(&self);
}

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("No upstream credential selected")]
pub struct CredentialUnavailable;

pub struct CredentialGate {
    host: Arc<dyn CredentialHost>,
}

impl CredentialGate {
    pub fn new(host: Arc<dyn CredentialHost>) -> Self {
        Self { host }
    }

    /// Succeeds immediately when a credential is already selected; otherwise
    /// runs the acquisition flow once and re-checks.
    pub async fn ensure_credential(&self) -> Result<(), CredentialUnavailable> {
        if self.host.has_credential().await {
            return Ok(());
        }
        tracing::info!("No upstream credential selected; requesting one");
        self.host.request_credential_selection().await;
        if self.host.has_credential().await {
            Ok(())
        } else {
            tracing::warn!("Credential selection dismissed");
            Err(CredentialUnavailable)
        }
    }
}

/// In-memory slot for the selected API key, shared between the credential
/// host and the HTTP client that reads it on every request.
#[derive(Debug, Clone, Default)]
pub struct ApiKeySlot(Arc<RwLock<Option<String>>>);

impl ApiKeySlot {
    pub fn new(key: Option<String>) -> Self {
        let slot = Self::default();
        if let Some(k) = key {
            slot.set(k);
        }
        slot
    }

    pub fn get(&self) -> Option<String> {
        self.0
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Stores `key`; blank keys clear the slot.
    pub fn set(&self, key: String) {
        let key = key.trim().to_string();
        let mut guard = self
            .0
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = (!key.is_empty()).then_some(key);
    }

    pub fn clear(&self) {
        self.set(String::new());
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }
}

/// Host with a fixed key chosen up front. Selection requests never change it.
pub struct StaticCredentialHost {
    slot: ApiKeySlot,
}

impl StaticCredentialHost {
    /// Stores `key` into `slot`; `None` leaves the host without a credential.
    pub fn new(slot: ApiKeySlot, key: Option<String>) -> Self {
        if let Some(key) = key {
            slot.set(key);
        }
        Self { slot }
    }
}

#[async_trait]
impl CredentialHost for StaticCredentialHost {
    async fn has_credential(&self) -> bool {
        self.slot.is_set()
    }

    async fn request_credential_selection(&self) {
        tracing::debug!("Static credential host has no selection flow");
    }
}

/// Reads the API key from an environment variable and, when interactive,
/// falls back to prompting on the terminal. An empty line dismisses the prompt.
pub struct EnvCredentialHost {
    slot: ApiKeySlot,
    env_var: String,
    interactive: bool,
}

impl EnvCredentialHost {
    pub fn new(slot: ApiKeySlot, env_var: impl Into<String>, interactive: bool) -> Self {
        Self {
            slot,
            env_var: env_var.into(),
            interactive,
        }
    }
}

#[async_trait]
impl CredentialHost for EnvCredentialHost {
    async fn has_credential(&self) -> bool {
        if self.slot.is_set() {
            return true;
        }
        match std::env::var(&self.env_var) {
            Ok(key) if !key.trim().is_empty() => {
                self.slot.set(key);
                true
            }
            _ => false,
        }
    }

    async fn request_credential_selection(&self) {
        if !self.interactive {
            tracing::warn!(
                "No API key found; set {} to select a credential",
                self.env_var
            );
            return;
        }
        let env_var = self.env_var.clone();
        let entered = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
            let mut stderr = std::io::stderr();
            write!(
                stderr,
                "No API key found in ${}. Paste a key (empty to cancel): ",
                env_var
            )?;
            stderr.flush()?;
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match entered {
            Ok(Ok(line)) => self.slot.set(line),
            Ok(Err(e)) => tracing::warn!("Failed to read API key: {}", e),
            Err(e) => tracing::warn!("API key prompt task failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedHost {
        present: RwLock<bool>,
        grant_on_request: bool,
        requests: AtomicUsize,
    }

    impl ScriptedHost {
        fn new(present: bool, grant_on_request: bool) -> Arc<Self> {
            Arc::new(Self {
                present: RwLock::new(present),
                grant_on_request,
                requests: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CredentialHost for ScriptedHost {
        async fn has_credential(&self) -> bool {
            *self.present.read().unwrap()
        }

        async fn request_credential_selection(&self) {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if self.grant_on_request {
                *self.present.write().unwrap() = true;
            }
        }
    }

    #[tokio::test]
    async fn present_credential_is_noop() {
        let host = ScriptedHost::new(true, false);
        let gate = CredentialGate::new(host.clone());
        gate.ensure_credential().await.unwrap();
        gate.ensure_credential().await.unwrap();
        assert_eq!(host.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn absent_credential_granted_by_prompt() {
        let host = ScriptedHost::new(false, true);
        let gate = CredentialGate::new(host.clone());
        gate.ensure_credential().await.unwrap();
        assert_eq!(host.requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dismissed_prompt_fails() {
        let host = ScriptedHost::new(false, false);
        let gate = CredentialGate::new(host.clone());
        assert_eq!(gate.ensure_credential().await, Err(CredentialUnavailable));
        assert_eq!(host.requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn api_key_slot_trims_and_clears() {
        let slot = ApiKeySlot::new(Some("  abc \n".into()));
        assert_eq!(slot.get().as_deref(), Some("abc"));
        slot.set("   ".into());
        assert!(!slot.is_set());
        slot.set("k".into());
        slot.clear();
        assert_eq!(slot.get(), None);
    }

    #[tokio::test]
    async fn static_host_shares_key_with_slot() {
        let slot = ApiKeySlot::default();
        let gate = CredentialGate::new(Arc::new(StaticCredentialHost::new(
            slot.clone(),
            Some(" fixed ".into()),
        )));
        gate.ensure_credential().await.unwrap();
        assert_eq!(slot.get().as_deref(), Some("fixed"));
    }

    #[tokio::test]
    async fn static_host_without_key_is_unavailable() {
        let slot = ApiKeySlot::default();
        let gate = CredentialGate::new(Arc::new(StaticCredentialHost::new(slot.clone(), None)));
        assert_eq!(gate.ensure_credential().await, Err(CredentialUnavailable));
        assert!(!slot.is_set());
    }

    #[tokio::test]
    async fn env_host_uses_preselected_slot() {
        let host = EnvCredentialHost::new(
            ApiKeySlot::new(Some("key".into())),
            "GENSTUDIO_TEST_UNSET_KEY_VAR",
            false,
        );
        assert!(host.has_credential().await);
    }

    #[tokio::test]
    async fn env_host_non_interactive_dismisses() {
        let slot = ApiKeySlot::default();
        let host = EnvCredentialHost::new(slot.clone(), "GENSTUDIO_TEST_UNSET_KEY_VAR", false);
        let gate = CredentialGate::new(Arc::new(host));
        assert_eq!(gate.ensure_credential().await, Err(CredentialUnavailable));
        assert!(!slot.is_set());
    }
}
