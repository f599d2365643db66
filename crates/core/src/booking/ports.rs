//! Port interfaces for portal access
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use impfbot_domain::{Appointment, Authentication, LoginPayload, Result};

/// Supplies the login form payload.
///
/// Implementations fail only with their own I/O errors (missing file,
/// malformed content); those are fatal to the core.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Produce the payload for a single login call.
    async fn login_payload(&self) -> Result<LoginPayload>;
}

/// One authenticated (or authenticatable) portal session.
///
/// A session exclusively owns one HTTP transport and its bearer state.
/// Citizen resolution is memoized for the session's lifetime; dropping the
/// session releases the transport and every cache with it.
#[async_trait]
pub trait PortalSession: Send + Sync {
    /// Execute the browser login flow and return the authorization code.
    async fn login(&self, payload: &LoginPayload) -> Result<String>;

    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<Authentication>;

    /// Obtain fresh tokens from a refresh token.
    ///
    /// Never called automatically; the caller decides after observing
    /// [`ImpfbotError::RefreshNeeded`](impfbot_domain::ImpfbotError::RefreshNeeded).
    async fn refresh_token(&self, refresh_token: &str) -> Result<Authentication>;

    /// Bind a bearer credential to the session. Idempotent; overwrites any
    /// previously bound credential.
    fn authenticate(&self, authentication: &Authentication);

    /// The citizen's currently booked appointment, or the sentinel.
    async fn current_appointment(&self) -> Result<Appointment>;

    /// The next free slot at or after `first_day`, or the sentinel.
    async fn next_appointment(&self, first_day: NaiveDate) -> Result<Appointment>;

    /// Probe every day in `first_day ..= first_day + days` in ascending
    /// order and collect the distinct slots found.
    async fn appointments_in_range(
        &self,
        first_day: NaiveDate,
        days: u32,
    ) -> Result<HashSet<Appointment>>;

    /// Book the given slot for the citizen.
    async fn book_appointment(&self, appointment: &Appointment) -> Result<()>;

    /// Whether the citizen already holds an appointment.
    async fn has_next_appointment(&self) -> Result<bool> {
        Ok(self.current_appointment().await?.is_scheduled())
    }
}

/// Creates portal sessions.
///
/// The service opens a fresh session per top-level call so that no header
/// state or memoized citizen ever leaks across calls.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Open a new, unauthenticated session.
    async fn open_session(&self) -> Result<Box<dyn PortalSession>>;
}
