use crate::store::SharedRecord;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use tracing::warn;

/// Record key holding the access token.
pub const TOKEN_KEY: &str = "governorAccessToken";
/// Record key holding the access token expiry (RFC 3339).
pub const EXPIRY_KEY: &str = "governorAccessTokenExpiry";

/// Cached bearer token and the instant it stops being usable.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Builds a credential from an issuer grant, capping its lifetime at `max_age`.
    pub fn issued(
        token: impl Into<String>,
        expires_in: Duration,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let lifetime = TimeDelta::from_std(expires_in.min(max_age)).unwrap_or(TimeDelta::MAX);
        Self {
            token: token.into(),
            expires_at: now.checked_add_signed(lifetime).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// A credential is usable iff it has a token and `now` is before its expiry.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && now < self.expires_at
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Reads the credential fields of a shared record.
    ///
    /// Missing fields yield `None`; so does an unparseable expiry, which is logged and
    /// later overwritten by the next refresh.
    pub fn from_record(record: &SharedRecord) -> Option<Self> {
        let token = record.get(TOKEN_KEY).filter(|t| !t.is_empty())?;
        let raw_expiry = record.get(EXPIRY_KEY)?;
        match DateTime::parse_from_rfc3339(raw_expiry) {
            Ok(expiry) => Some(Self::new(token, expiry.with_timezone(&Utc))),
            Err(e) => {
                warn!(
                    record = %record.location(),
                    error = %e,
                    "shared credential record has an invalid expiry; ignoring it"
                );
                None
            }
        }
    }

    pub fn write_to(&self, record: &mut SharedRecord) {
        record
            .data
            .insert(TOKEN_KEY.to_string(), self.token.clone());
        record
            .data
            .insert(EXPIRY_KEY.to_string(), self.expires_at.to_rfc3339());
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = (!self.token.is_empty()).then_some("<redacted>");
        f.debug_struct("Credential")
            .field("token", &token)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
