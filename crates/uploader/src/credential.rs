//! Credential invalidation and the pre-job credential check.

use std::sync::Arc;

use rand::Rng;
use tracing::{error, info, warn};

use replaybot_settings::{SettingKey, SettingsStore, generate_token, link_url};

/// Surfaces the account-linking instruction to the user.
///
/// The host provides the UI; the pipeline only calls this.
pub trait Notifier: Send + Sync {
    fn link_required(&self, link: &str);
}

/// Notifier for headless hosts: the link ends up in the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn link_required(&self, link: &str) {
        warn!(link = %link, "link this uploader to the bot to enable uploads");
    }
}

/// Clears the stored credential so the next job starts re-linking.
///
/// Chunks already in flight keep the credential they were dispatched with.
#[derive(Clone)]
pub struct CredentialInvalidator {
    store: Arc<dyn SettingsStore>,
}

impl CredentialInvalidator {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    pub fn invalidate(&self) {
        match self.store.set(SettingKey::Token, "") {
            Ok(()) => info!("stored credential cleared"),
            Err(e) => error!(error = %e, "failed to clear stored credential"),
        }
    }
}

/// Returns the stored credential, or `None` after starting the linking flow.
///
/// With no credential stored, a fresh placeholder token is generated and
/// persisted and the user is shown the link binding it to their account.
pub fn ensure_credential<R: Rng + ?Sized>(
    store: &dyn SettingsStore,
    rng: &mut R,
    notifier: &dyn Notifier,
    link_base: &str,
) -> Option<String> {
    let token = store.get(SettingKey::Token);
    if !token.is_empty() {
        return Some(token);
    }

    let placeholder = generate_token(rng);
    if let Err(e) = store.set(SettingKey::Token, &placeholder) {
        error!(error = %e, "failed to persist placeholder credential");
        return None;
    }
    notifier.link_required(&link_url(link_base, &placeholder));
    None
}
