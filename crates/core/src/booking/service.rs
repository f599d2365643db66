//! Appointment service - orchestration façade over portal sessions

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use impfbot_domain::{Appointment, Authentication, ImpfbotError, Result};
use tracing::debug;

use super::ports::{CredentialSource, PortalSession, SessionFactory};

/// Stateless façade hiding session construction and teardown from callers.
///
/// Every public operation acquires a fresh [`PortalSession`] scoped to that
/// single call, authenticates it (except [`Self::authentication`], which runs
/// the login flow itself), delegates, and releases the session on every exit
/// path by dropping it. The only value that survives between calls is the
/// [`Authentication`] the caller passes back in.
pub struct AppointmentService {
    sessions: Arc<dyn SessionFactory>,
}

impl AppointmentService {
    /// Create a new service over the given session factory.
    pub fn new(sessions: Arc<dyn SessionFactory>) -> Self {
        Self { sessions }
    }

    /// Run the full login flow and return the resulting tokens.
    pub async fn authentication(
        &self,
        credentials: &dyn CredentialSource,
    ) -> Result<Authentication> {
        let session = self.sessions.open_session().await?;
        let payload = credentials.login_payload().await?;
        let code = session.login(&payload).await?;
        let authentication = session.exchange_code(&code).await?;
        debug!("login flow completed");
        Ok(authentication)
    }

    /// Trade an authentication's refresh token for fresh tokens.
    pub async fn refreshed_authentication(
        &self,
        authentication: &Authentication,
    ) -> Result<Authentication> {
        let refresh_token = authentication.refresh_token.as_deref().ok_or_else(|| {
            ImpfbotError::InvalidInput("authentication has no refresh token".to_string())
        })?;
        let session = self.sessions.open_session().await?;
        session.refresh_token(refresh_token).await
    }

    /// The citizen's currently booked appointment, or the sentinel.
    pub async fn current_appointment(
        &self,
        authentication: &Authentication,
    ) -> Result<Appointment> {
        let session = self.authenticated_session(authentication).await?;
        session.current_appointment().await
    }

    /// The next free slot at or after `first_day`, or the sentinel.
    pub async fn next_appointment(
        &self,
        authentication: &Authentication,
        first_day: NaiveDate,
    ) -> Result<Appointment> {
        let session = self.authenticated_session(authentication).await?;
        session.next_appointment(first_day).await
    }

    /// All distinct free slots found by probing `first_day ..= first_day + days`.
    pub async fn appointments_in_range(
        &self,
        authentication: &Authentication,
        first_day: NaiveDate,
        days: u32,
    ) -> Result<HashSet<Appointment>> {
        let session = self.authenticated_session(authentication).await?;
        session.appointments_in_range(first_day, days).await
    }

    /// Book the given slot.
    pub async fn book_appointment(
        &self,
        authentication: &Authentication,
        appointment: &Appointment,
    ) -> Result<()> {
        let session = self.authenticated_session(authentication).await?;
        session.book_appointment(appointment).await
    }

    /// Whether the citizen already holds an appointment.
    pub async fn has_next_appointment(&self, authentication: &Authentication) -> Result<bool> {
        Ok(self.current_appointment(authentication).await?.is_scheduled())
    }

    async fn authenticated_session(
        &self,
        authentication: &Authentication,
    ) -> Result<Box<dyn PortalSession>> {
        let session = self.sessions.open_session().await?;
        session.authenticate(authentication);
        Ok(session)
    }
}
