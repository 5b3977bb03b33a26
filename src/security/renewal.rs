use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::security::credentials::{CredentialStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

/// Why a renewal attempt settled as failure. Shared verbatim with every
/// request waiting on the same exchange, so it must be cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalError {
    /// No refresh credential in storage; the exchange is never attempted.
    MissingRefreshCredential,
    /// The renewal endpoint rejected the exchange or was unreachable.
    ExchangeFailed(String),
}

impl std::fmt::Display for RenewalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenewalError::MissingRefreshCredential => {
                write!(f, "no refresh credential in storage")
            }
            RenewalError::ExchangeFailed(reason) => {
                write!(f, "renewal exchange failed: {reason}")
            }
        }
    }
}

type RenewalResult = Result<String, RenewalError>;

/// Response envelope of the renewal endpoint:
/// `{"data": {"accessToken": "..."}}` inside the common wrapper.
#[derive(Debug, Deserialize)]
struct RenewalEnvelope {
    #[serde(default)]
    data: RenewalData,
}

#[derive(Debug, Deserialize, Default)]
struct RenewalData {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
}

/// Coordinates the exchange of the refresh credential for a fresh access
/// credential.
///
/// At most one exchange is outstanding at a time: the first request that
/// observes an expired credential becomes the leader and performs the
/// exchange, every request failing while it is outstanding awaits the same
/// settled outcome. The slot is cleared once settled so the next expiry
/// event starts a fresh exchange.
pub struct RenewalCoordinator {
    http: Client,
    renewal_url: String,
    storage: Arc<dyn CredentialStore>,
    in_flight: Mutex<Option<watch::Receiver<Option<RenewalResult>>>>,
    last_renewed: Mutex<Option<DateTime<Utc>>>,
}

/// Clears the in-flight slot even if the leader is dropped mid-exchange,
/// so an abandoned exchange cannot wedge future renewals.
struct SlotGuard<'a> {
    coordinator: &'a RenewalCoordinator,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self
            .coordinator
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

impl RenewalCoordinator {
    pub fn new(http: Client, base_endpoint: &str, storage: Arc<dyn CredentialStore>) -> Self {
        let renewal_url = format!(
            "{}/api/user/refresh-token",
            base_endpoint.trim_end_matches('/')
        );
        Self {
            http,
            renewal_url,
            storage,
            in_flight: Mutex::new(None),
            last_renewed: Mutex::new(None),
        }
    }

    /// Obtain a fresh access credential, joining an outstanding exchange if
    /// one exists. On success the new credential is already persisted.
    pub async fn renew(&self) -> RenewalResult {
        enum Role {
            Leader(watch::Sender<Option<RenewalResult>>),
            Waiter(watch::Receiver<Option<RenewalResult>>),
        }

        let role = {
            let mut slot = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match slot.as_ref() {
                Some(rx) => Role::Waiter(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    *slot = Some(rx);
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Waiter(mut rx) => {
                debug!("renewal already in flight, awaiting shared outcome");
                loop {
                    if let Some(result) = rx.borrow().clone() {
                        return result;
                    }
                    if rx.changed().await.is_err() {
                        return Err(RenewalError::ExchangeFailed(
                            "renewal abandoned before settling".to_string(),
                        ));
                    }
                }
            }
            Role::Leader(tx) => {
                let guard = SlotGuard { coordinator: self };
                let result = self.exchange().await;
                drop(guard);
                let _ = tx.send(Some(result.clone()));
                result
            }
        }
    }

    /// Time of the last successful renewal, if any.
    pub fn last_renewed(&self) -> Option<DateTime<Utc>> {
        *self.last_renewed.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn exchange(&self) -> RenewalResult {
        let refresh = match self.storage.get(REFRESH_TOKEN_KEY) {
            Some(token) if !token.is_empty() => token,
            _ => {
                warn!("no refresh credential in storage, cannot renew");
                return Err(RenewalError::MissingRefreshCredential);
            }
        };

        debug!(url = %self.renewal_url, "exchanging refresh credential");

        let response = self
            .http
            .post(&self.renewal_url)
            .header(AUTHORIZATION, format!("Bearer {refresh}"))
            .send()
            .await
            .map_err(|err| RenewalError::ExchangeFailed(format!("sending renewal request: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "renewal exchange rejected");
            return Err(RenewalError::ExchangeFailed(format!(
                "status {status}: {body}"
            )));
        }

        let envelope: RenewalEnvelope = response
            .json()
            .await
            .map_err(|err| RenewalError::ExchangeFailed(format!("parsing renewal response: {err}")))?;

        let access = envelope.data.access_token.ok_or_else(|| {
            RenewalError::ExchangeFailed("accessToken missing from renewal response".to_string())
        })?;

        self.storage.set(ACCESS_TOKEN_KEY, &access);
        {
            let mut last = self.last_renewed.lock().unwrap_or_else(|e| e.into_inner());
            *last = Some(Utc::now());
        }
        info!("access credential renewed");

        Ok(access)
    }
}
