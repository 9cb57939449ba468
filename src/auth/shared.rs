use super::BearerTokenProvider;
use super::clock::Clock;
use super::credential::Credential;
use super::issuer::TokenIssuer;
use super::refresh::{RefreshSettings, TokenRefresher};
use super::secret::{SecretRef, SecretStore, read_api_token};
use crate::error::{AuthError, StoreError};
use crate::store::{RecordRef, SharedRecordStore};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Read-modify-write rounds before a publish gives up on conflicts.
pub const MAX_WRITE_ROUNDS: u32 = 3;

/// Bearer token cache kept in a record shared by every replica.
///
/// A usable credential in the record is returned as is. Otherwise this replica
/// refreshes and publishes under the record's version precondition; losing a race to a
/// replica that published a usable credential means adopting that one.
pub struct SharedCredentialProvider {
    refresher: TokenRefresher,
    store: Arc<dyn SharedRecordStore>,
    location: RecordRef,
    guard: Mutex<()>,
}

impl SharedCredentialProvider {
    pub fn new(
        api_token: impl Into<String>,
        issuer: Arc<dyn TokenIssuer>,
        clock: Arc<dyn Clock>,
        settings: RefreshSettings,
        store: Arc<dyn SharedRecordStore>,
        location: RecordRef,
    ) -> Self {
        Self {
            refresher: TokenRefresher::new(api_token.into(), issuer, clock, settings),
            store,
            location,
            guard: Mutex::new(()),
        }
    }

    /// Reads the API token and obtains a credential right away, adopting a usable one
    /// from the record or refreshing. Any failure fails construction.
    #[allow(clippy::too_many_arguments)]
    pub async fn from_secret(
        secrets: &dyn SecretStore,
        secret: &SecretRef,
        issuer: Arc<dyn TokenIssuer>,
        clock: Arc<dyn Clock>,
        settings: RefreshSettings,
        store: Arc<dyn SharedRecordStore>,
        location: RecordRef,
        cancel: &CancellationToken,
    ) -> Result<Self, AuthError> {
        let api_token = read_api_token(secrets, secret).await?;
        let provider = Self::new(api_token, issuer, clock, settings, store, location);
        provider
            .bearer_token(cancel)
            .await
            .map_err(|e| AuthError::Validation(Box::new(e)))?;
        info!(record = %provider.location, "API token validated");
        Ok(provider)
    }

    pub fn location(&self) -> &RecordRef {
        &self.location
    }

    async fn stored_credential(&self) -> Result<Option<Credential>, StoreError> {
        let record = self.store.get_or_create(&self.location).await?;
        let now = self.refresher.clock().now();
        Ok(Credential::from_record(&record).filter(|c| c.is_usable_at(now)))
    }

    /// Writes `fresh` to the record, or adopts a usable credential another writer
    /// stored first.
    async fn publish(&self, fresh: Credential) -> Result<Credential, AuthError> {
        for round in 1..=MAX_WRITE_ROUNDS {
            let mut record = self.store.get_or_create(&self.location).await?;
            let now = self.refresher.clock().now();
            let usable = Credential::from_record(&record).filter(|c| c.is_usable_at(now));
            if let Some(existing) = usable {
                info!(
                    record = %self.location,
                    expires_at = %existing.expires_at(),
                    "adopting access token published by another writer"
                );
                return Ok(existing);
            }

            fresh.write_to(&mut record);
            match self.store.update(&record).await {
                Ok(stored) => {
                    debug!(
                        record = %self.location,
                        version = stored.version,
                        "published access token"
                    );
                    return Ok(fresh);
                }
                Err(StoreError::Conflict { expected, .. }) => {
                    warn!(
                        record = %self.location,
                        round,
                        expected,
                        "shared credential record changed concurrently; re-reading"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AuthError::ConflictRetriesExhausted {
            attempts: MAX_WRITE_ROUNDS,
        })
    }
}

#[async_trait]
impl BearerTokenProvider for SharedCredentialProvider {
    async fn bearer_token(&self, cancel: &CancellationToken) -> Result<String, AuthError> {
        let _guard = self.guard.lock().await;

        if let Some(credential) = self.stored_credential().await? {
            return Ok(credential.token().to_string());
        }

        debug!(record = %self.location, "shared access token missing or expired; refreshing");
        let fresh = self.refresher.refresh(cancel).await?;
        let credential = self.publish(fresh).await?;
        Ok(credential.token().to_string())
    }
}

impl std::fmt::Debug for SharedCredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCredentialProvider")
            .field("refresher", &self.refresher)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::credential::{EXPIRY_KEY, TOKEN_KEY};
    use crate::auth::issuer::IssuedToken;
    use crate::error::OauthError;
    use crate::retry::{DelayPolicy, RetryPolicy};
    use crate::store::{MemoryRecordStore, SharedRecord};
    use chrono::{DateTime, TimeDelta, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Issues `tok-<n>` for the n-th call.
    #[derive(Default)]
    struct CountingIssuer {
        calls: AtomicU32,
        expires_in: u64,
    }

    impl CountingIssuer {
        fn with_lifetime(expires_in: u64) -> Self {
            Self {
                calls: AtomicU32::new(0),
                expires_in,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenIssuer for CountingIssuer {
        async fn issue(&self, _api_token: &str) -> Result<IssuedToken, OauthError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(IssuedToken {
                access_token: format!("tok-{n}"),
                expires_in: self.expires_in,
            })
        }
    }

    /// Lets another writer slip in before each of the first `races` updates.
    struct RacingStore {
        inner: MemoryRecordStore,
        races: AtomicU32,
        competing: Box<dyn Fn(&mut SharedRecord) + Send + Sync>,
    }

    impl RacingStore {
        fn new(races: u32, competing: impl Fn(&mut SharedRecord) + Send + Sync + 'static) -> Self {
            Self {
                inner: MemoryRecordStore::new(),
                races: AtomicU32::new(races),
                competing: Box::new(competing),
            }
        }
    }

    #[async_trait]
    impl SharedRecordStore for RacingStore {
        async fn get_or_create(&self, location: &RecordRef) -> Result<SharedRecord, StoreError> {
            self.inner.get_or_create(location).await
        }

        async fn update(&self, record: &SharedRecord) -> Result<SharedRecord, StoreError> {
            let remaining = self.races.load(Ordering::SeqCst);
            if remaining > 0 {
                self.races.store(remaining - 1, Ordering::SeqCst);
                let mut other = self.inner.get_or_create(&record.location()).await?;
                (self.competing)(&mut other);
                self.inner.update(&other).await?;
            }
            self.inner.update(record).await
        }
    }

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn settings() -> RefreshSettings {
        RefreshSettings {
            max_age: Duration::from_secs(600),
            policy: RetryPolicy::new("test refresh", 1, DelayPolicy::fixed(Duration::ZERO)),
        }
    }

    fn location() -> RecordRef {
        RecordRef::new("cnsi-system", "governor-access-token")
    }

    fn provider(
        issuer: &Arc<CountingIssuer>,
        clock: &Arc<ManualClock>,
        store: Arc<dyn SharedRecordStore>,
    ) -> SharedCredentialProvider {
        SharedCredentialProvider::new(
            "api-token",
            issuer.clone(),
            clock.clone(),
            settings(),
            store,
            location(),
        )
    }

    #[tokio::test]
    async fn replicas_share_one_refresh() {
        let issuer = Arc::new(CountingIssuer::with_lifetime(300));
        let clock = Arc::new(ManualClock::new(start()));
        let store: Arc<MemoryRecordStore> = Arc::new(MemoryRecordStore::new());
        let a = provider(&issuer, &clock, store.clone());
        let b = provider(&issuer, &clock, store.clone());
        let cancel = CancellationToken::new();

        assert_eq!(a.bearer_token(&cancel).await.unwrap(), "tok-1");
        assert_eq!(b.bearer_token(&cancel).await.unwrap(), "tok-1");
        assert_eq!(issuer.calls(), 1);

        let record = store.snapshot(&location()).unwrap();
        assert_eq!(record.get(TOKEN_KEY), Some("tok-1"));
        assert_eq!(
            record.get(EXPIRY_KEY),
            Some((start() + TimeDelta::seconds(300)).to_rfc3339().as_str())
        );
        assert_eq!(record.version, 1);
    }

    #[tokio::test]
    async fn expired_record_is_refreshed_and_overwritten() {
        let issuer = Arc::new(CountingIssuer::with_lifetime(10));
        let clock = Arc::new(ManualClock::new(start()));
        let store = Arc::new(MemoryRecordStore::new());
        let a = provider(&issuer, &clock, store.clone());
        let cancel = CancellationToken::new();

        assert_eq!(a.bearer_token(&cancel).await.unwrap(), "tok-1");
        clock.advance(Duration::from_secs(11));
        assert_eq!(a.bearer_token(&cancel).await.unwrap(), "tok-2");
        assert_eq!(issuer.calls(), 2);
        assert_eq!(store.snapshot(&location()).unwrap().version, 2);
    }

    #[tokio::test]
    async fn conflicting_writer_with_usable_token_is_adopted() {
        let expiry = (start() + TimeDelta::seconds(120)).to_rfc3339();
        let peer_writes_token = move |record: &mut SharedRecord| {
            record.data.insert(TOKEN_KEY.to_string(), "peer-token".to_string());
            record.data.insert(EXPIRY_KEY.to_string(), expiry.clone());
        };
        let store = Arc::new(RacingStore::new(1, peer_writes_token));
        let issuer = Arc::new(CountingIssuer::with_lifetime(300));
        let clock = Arc::new(ManualClock::new(start()));
        let a = provider(&issuer, &clock, store.clone());

        let token = a.bearer_token(&CancellationToken::new()).await.unwrap();
        assert_eq!(token, "peer-token");
        assert_eq!(issuer.calls(), 1);

        let record = store.inner.snapshot(&location()).unwrap();
        assert_eq!(record.get(TOKEN_KEY), Some("peer-token"));
    }

    #[tokio::test]
    async fn conflicting_writer_without_token_is_overwritten() {
        let peer_writes_other_key = |record: &mut SharedRecord| {
            record.data.insert("unrelated".to_string(), "value".to_string());
        };
        let store = Arc::new(RacingStore::new(2, peer_writes_other_key));
        let issuer = Arc::new(CountingIssuer::with_lifetime(300));
        let clock = Arc::new(ManualClock::new(start()));
        let a = provider(&issuer, &clock, store.clone());

        let token = a.bearer_token(&CancellationToken::new()).await.unwrap();
        assert_eq!(token, "tok-1");

        let record = store.inner.snapshot(&location()).unwrap();
        assert_eq!(record.get(TOKEN_KEY), Some("tok-1"));
        assert_eq!(record.get("unrelated"), Some("value"));
        assert_eq!(record.version, 3);
    }

    #[tokio::test]
    async fn persistent_conflicts_give_up() {
        let store = Arc::new(RacingStore::new(u32::MAX, |record| {
            record.data.insert("unrelated".to_string(), "value".to_string());
        }));
        let issuer = Arc::new(CountingIssuer::with_lifetime(300));
        let clock = Arc::new(ManualClock::new(start()));
        let a = provider(&issuer, &clock, store);

        let err = a.bearer_token(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::ConflictRetriesExhausted {
                attempts: MAX_WRITE_ROUNDS
            }
        ));
    }

    #[tokio::test]
    async fn corrupt_expiry_is_replaced() {
        let store = Arc::new(MemoryRecordStore::new());
        let mut record = store.get_or_create(&location()).await.unwrap();
        record.data.insert(TOKEN_KEY.to_string(), "stale".to_string());
        record.data.insert(EXPIRY_KEY.to_string(), "not-a-date".to_string());
        store.update(&record).await.unwrap();

        let issuer = Arc::new(CountingIssuer::with_lifetime(300));
        let clock = Arc::new(ManualClock::new(start()));
        let a = provider(&issuer, &clock, store.clone());

        assert_eq!(a.bearer_token(&CancellationToken::new()).await.unwrap(), "tok-1");
        let record = store.snapshot(&location()).unwrap();
        assert_eq!(record.get(TOKEN_KEY), Some("tok-1"));
    }
}
