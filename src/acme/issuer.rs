//! HTTP-01 issuance driven through `instant-acme`.
//!
//! # Flow
//! ```text
//! account (stored credentials for the same directory and EAB kid,
//!          else a new registration, EAB for ZeroSSL)
//!     → new order for one DNS identifier
//!     → authorizations → http-01 key authorization written to ChallengeStore
//!     → challenge marked ready
//!     → poll order until ready            (bounded by auth_timeout_secs)
//!     → key pair + CSR (rcgen) → finalize
//!     → poll for certificate chain        (bounded by finalize_timeout_secs)
//!     → challenge files removed
//! ```
//!
//! The protocol itself (JWS, nonces, retries on badNonce) belongs to the
//! client library; this module only sequences the calls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use instant_acme::{
    Account, AccountCredentials, AuthorizationStatus, ChallengeType, ExternalAccountKey,
    HttpClient, Identifier, NewAccount, NewOrder, Order, OrderStatus, Problem,
};
use rcgen::{CertificateParams, KeyPair};
use tracing::{debug, info, trace, warn};

use crate::acme::error::{AcmeError, AcmeResult};
use crate::acme::Provider;
use crate::config::validation::decode_hmac_key;
use crate::config::AcmeConfig;
use crate::resilience::PollSchedule;
use crate::storage::{AccountStore, CertificateBundle, ChallengeStore, StoredAccount};

/// Something that can turn a domain into a certificate bundle.
///
/// The HTTP layer only depends on this trait, so tests can swap in an issuer
/// that never talks to a CA.
#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    async fn issue(&self, domain: &str, provider: Provider) -> AcmeResult<CertificateBundle>;
}

/// Builds the HTTP client each ACME account talks through.
pub type HttpClientFactory = Arc<dyn Fn() -> Box<dyn HttpClient> + Send + Sync>;

/// Issues certificates from a real ACME server.
pub struct AcmeIssuer {
    config: AcmeConfig,
    challenges: ChallengeStore,
    accounts: Option<AccountStore>,
    cleanup_challenges: bool,
    http: Option<HttpClientFactory>,
}

impl AcmeIssuer {
    /// `accounts` enables credential reuse; pass `None` to register a fresh
    /// account for every issuance.
    pub fn new(config: AcmeConfig, challenges: ChallengeStore, accounts: Option<AccountStore>) -> Self {
        Self {
            config,
            challenges,
            accounts,
            cleanup_challenges: true,
            http: None,
        }
    }

    /// Keep challenge files after issuance (useful when debugging a CA).
    pub fn cleanup_challenges(mut self, enabled: bool) -> Self {
        self.cleanup_challenges = enabled;
        self
    }

    /// Talk to the CA through a custom HTTP client instead of the built-in
    /// rustls one (egress proxies, private CAs).
    pub fn with_http_client(mut self, factory: HttpClientFactory) -> Self {
        self.http = Some(factory);
        self
    }

    fn poll_schedule(&self) -> PollSchedule {
        PollSchedule::new(
            Duration::from_millis(self.config.poll_interval_ms),
            Duration::from_millis(self.config.poll_max_interval_ms),
        )
    }

    fn external_account(&self, provider: Provider) -> AcmeResult<Option<ExternalAccountKey>> {
        if !provider.requires_eab() {
            return Ok(None);
        }
        let eab = self.config.zerossl_eab.as_ref().ok_or(AcmeError::MissingEab)?;
        let key = decode_hmac_key(&eab.hmac_key).ok_or(AcmeError::InvalidEabKey)?;
        Ok(Some(ExternalAccountKey::new(eab.kid.clone(), &key)))
    }

    fn eab_kid(&self, provider: Provider) -> Option<&str> {
        if !provider.requires_eab() {
            return None;
        }
        self.config.zerossl_eab.as_ref().map(|eab| eab.kid.as_str())
    }

    async fn restore_account(
        &self,
        store: &AccountStore,
        provider: Provider,
        directory: &str,
    ) -> Option<Account> {
        let stored = match store
            .load::<StoredAccount<AccountCredentials>>(provider.as_str())
            .await
        {
            Ok(Some(stored)) => stored,
            Ok(None) => return None,
            Err(e) => {
                warn!(provider = %provider, error = %e, "Failed to read stored ACME account, registering a new one");
                return None;
            }
        };

        let eab_kid = self.eab_kid(provider);
        if !stored.matches(directory, eab_kid) {
            info!(
                provider = %provider,
                stored_directory = %stored.directory,
                directory = %directory,
                "Stored ACME account belongs to another CA or key id, registering a new one"
            );
            return None;
        }

        let restored = match &self.http {
            Some(http) => Account::from_credentials_and_http(stored.credentials, http()).await,
            None => Account::from_credentials(stored.credentials).await,
        };
        match restored {
            Ok(account) => {
                debug!(provider = %provider, "Restored ACME account from stored credentials");
                Some(account)
            }
            Err(e) => {
                warn!(provider = %provider, error = %e, "Stored ACME account unusable, registering a new one");
                None
            }
        }
    }

    async fn account(&self, provider: Provider) -> AcmeResult<Account> {
        let directory = provider.directory_url(&self.config);

        if let Some(store) = &self.accounts {
            if let Some(account) = self.restore_account(store, provider, directory).await {
                return Ok(account);
            }
        }

        let external_account = self.external_account(provider)?;
        let contact = format!("mailto:{}", self.config.contact_email);
        let new_account = NewAccount {
            contact: &[contact.as_str()],
            terms_of_service_agreed: true,
            only_return_existing: false,
        };

        let created = match &self.http {
            Some(http) => {
                Account::create_with_http(&new_account, directory, external_account.as_ref(), http())
                    .await
            }
            None => Account::create(&new_account, directory, external_account.as_ref()).await,
        };
        let (account, credentials) = created.map_err(|source| AcmeError::Account { provider, source })?;

        info!(provider = %provider, contact = %self.config.contact_email, "Registered ACME account");

        if let Some(store) = &self.accounts {
            let stored = StoredAccount {
                directory: directory.to_string(),
                eab_kid: self.eab_kid(provider).map(str::to_string),
                credentials,
            };
            if let Err(e) = store.save(provider.as_str(), &stored).await {
                warn!(provider = %provider, error = %e, "Failed to persist ACME account credentials");
            }
        }

        Ok(account)
    }

    /// Publish key authorizations for every pending authorization and tell
    /// the CA to validate them. Written tokens are pushed onto `tokens` as
    /// they are created so the caller can clean up after a failure.
    async fn present_challenges(
        &self,
        order: &mut Order,
        domain: &str,
        tokens: &mut Vec<String>,
    ) -> AcmeResult<()> {
        let authorizations = order
            .authorizations()
            .await
            .map_err(|source| AcmeError::Authorizations {
                domain: domain.to_string(),
                source,
            })?;

        for authz in &authorizations {
            match &authz.status {
                AuthorizationStatus::Valid => {
                    debug!(domain = %domain, "Authorization already valid");
                    continue;
                }
                AuthorizationStatus::Pending => {}
                status => {
                    return Err(AcmeError::AuthorizationState {
                        domain: domain.to_string(),
                        status: format!("{status:?}"),
                    })
                }
            }

            let challenge = authz
                .challenges
                .iter()
                .find(|c| c.r#type == ChallengeType::Http01)
                .ok_or_else(|| AcmeError::NoHttp01Challenge {
                    domain: domain.to_string(),
                    offered: authz
                        .challenges
                        .iter()
                        .map(|c| format!("{:?}", c.r#type))
                        .collect::<Vec<_>>()
                        .join(", "),
                })?;

            let key_authorization = order.key_authorization(challenge);
            self.challenges
                .put(&challenge.token, key_authorization.as_str())
                .await?;
            tokens.push(challenge.token.clone());

            info!(domain = %domain, token = %challenge.token, "Challenge published, notifying CA");

            order
                .set_challenge_ready(&challenge.url)
                .await
                .map_err(|source| AcmeError::ChallengeReady {
                    domain: domain.to_string(),
                    source,
                })?;
        }

        Ok(())
    }

    async fn await_ready(&self, order: &mut Order, domain: &str) -> AcmeResult<()> {
        let timeout_secs = self.config.auth_timeout_secs;
        tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            poll_until_ready(order, domain, self.poll_schedule()),
        )
        .await
        .map_err(|_| AcmeError::AuthorizationTimeout {
            domain: domain.to_string(),
            timeout_secs,
        })?
    }

    async fn finalize(&self, order: &mut Order, domain: &str) -> AcmeResult<CertificateBundle> {
        let csr_error = |source: rcgen::Error| AcmeError::Csr {
            domain: domain.to_string(),
            source,
        };
        let key_pair = KeyPair::generate().map_err(csr_error)?;
        let params = CertificateParams::new(vec![domain.to_string()]).map_err(csr_error)?;
        let csr = params.serialize_request(&key_pair).map_err(csr_error)?;

        if order.state().status != OrderStatus::Valid {
            order
                .finalize(csr.der())
                .await
                .map_err(|source| AcmeError::Finalize {
                    domain: domain.to_string(),
                    source,
                })?;
            debug!(domain = %domain, "Order finalized, waiting for certificate");
        }

        let timeout_secs = self.config.finalize_timeout_secs;
        let cert_pem = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            poll_certificate(order, domain, self.poll_schedule()),
        )
        .await
        .map_err(|_| AcmeError::CertificateTimeout {
            domain: domain.to_string(),
            timeout_secs,
        })??;

        Ok(CertificateBundle {
            cert_pem,
            key_pem: key_pair.serialize_pem(),
        })
    }

    async fn run_order(
        &self,
        order: &mut Order,
        domain: &str,
        tokens: &mut Vec<String>,
    ) -> AcmeResult<CertificateBundle> {
        self.present_challenges(order, domain, tokens).await?;
        self.await_ready(order, domain).await?;
        info!(domain = %domain, "Authorization completed");
        self.finalize(order, domain).await
    }
}

#[async_trait]
impl CertificateIssuer for AcmeIssuer {
    async fn issue(&self, domain: &str, provider: Provider) -> AcmeResult<CertificateBundle> {
        info!(domain = %domain, provider = %provider, "Starting certificate issuance");

        let account = self.account(provider).await?;

        let identifiers = [Identifier::Dns(domain.to_string())];
        let mut order = account
            .new_order(&NewOrder {
                identifiers: &identifiers,
            })
            .await
            .map_err(|source| AcmeError::NewOrder {
                domain: domain.to_string(),
                source,
            })?;
        debug!(domain = %domain, "Created ACME order");

        let mut tokens = Vec::new();
        let result = self.run_order(&mut order, domain, &mut tokens).await;

        if self.cleanup_challenges {
            self.challenges.remove_all(&tokens).await;
        }

        match &result {
            Ok(_) => info!(domain = %domain, provider = %provider, "Certificate issued"),
            Err(e) => warn!(domain = %domain, provider = %provider, error = %e, "Certificate issuance failed"),
        }
        result
    }
}

async fn poll_until_ready(order: &mut Order, domain: &str, mut schedule: PollSchedule) -> AcmeResult<()> {
    loop {
        let state = order.refresh().await.map_err(|source| AcmeError::Refresh {
            domain: domain.to_string(),
            source,
        })?;

        match state.status {
            OrderStatus::Ready | OrderStatus::Valid => return Ok(()),
            OrderStatus::Invalid => {
                return Err(AcmeError::OrderInvalid {
                    domain: domain.to_string(),
                    detail: describe_problem(state.error.as_ref()),
                })
            }
            OrderStatus::Pending | OrderStatus::Processing => {}
        }

        let delay = schedule.next_delay();
        trace!(
            domain = %domain,
            attempt = schedule.attempts(),
            delay_ms = delay.as_millis() as u64,
            "Order not ready yet"
        );
        tokio::time::sleep(delay).await;
    }
}

async fn poll_certificate(order: &mut Order, domain: &str, mut schedule: PollSchedule) -> AcmeResult<String> {
    loop {
        let chain = order
            .certificate()
            .await
            .map_err(|source| AcmeError::Certificate {
                domain: domain.to_string(),
                source,
            })?;

        if let Some(chain) = chain {
            return Ok(chain);
        }

        let delay = schedule.next_delay();
        trace!(domain = %domain, attempt = schedule.attempts(), "Certificate not available yet");
        tokio::time::sleep(delay).await;
    }
}

fn describe_problem(problem: Option<&Problem>) -> String {
    problem
        .map(|p| format!("{p:?}"))
        .unwrap_or_else(|| "CA gave no detail".to_string())
}
