//! Portal connector for the vaccination-appointment API
//!
//! One connector owns one HTTP session (transport, cookie jar, bearer state)
//! and is meant to live for a single top-level operation. The citizen lookup
//! is memoized per instance and dies with it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use impfbot_core::booking::ports::{PortalSession, SessionFactory};
use impfbot_domain::{
    Appointment, AppointmentListing, Authentication, BookingRequest, Citizen, ImpfbotError,
    LoginPayload, NextAppointmentResponse, PortalConfig, Result, TokenResponse,
};
use reqwest::header::LOCATION;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

use super::login_page::{self, LoginFailure};
use crate::http::HttpClient;

const ALLOW_OK: &[StatusCode] = &[StatusCode::OK];
const ALLOW_OK_OR_NOT_FOUND: &[StatusCode] = &[StatusCode::OK, StatusCode::NOT_FOUND];
/// The login POST answers 200 with an error page on failure and a redirect
/// carrying the authorization code on success.
const ALLOW_LOGIN: &[StatusCode] = &[StatusCode::OK, StatusCode::FOUND, StatusCode::SEE_OTHER];

/// Connector implementing [`PortalSession`] against the real portal.
pub struct PortalConnector {
    config: Arc<PortalConfig>,
    timezone: Tz,
    http: HttpClient,
    bearer: Mutex<Option<String>>,
    citizen: OnceCell<Citizen>,
}

impl PortalConnector {
    /// Create a connector with a fresh HTTP session.
    pub fn new(config: Arc<PortalConfig>) -> Result<Self> {
        let timezone = config.timezone.parse::<Tz>().map_err(|err| {
            ImpfbotError::Config(format!("unknown portal timezone [{}]: {err}", config.timezone))
        })?;

        let mut http = HttpClient::builder()
            .timeout(Duration::from_secs(config.http.timeout_seconds));
        if let Some(agent) = &config.http.user_agent {
            http = http.user_agent(agent.clone());
        }

        Ok(Self {
            config,
            timezone,
            http: http.build()?,
            bearer: Mutex::new(None),
            citizen: OnceCell::new(),
        })
    }

    fn bearer(&self) -> Option<String> {
        self.bearer.lock().map_or(None, |guard| (*guard).clone())
    }

    fn with_bearer(&self, request: RequestBuilder) -> RequestBuilder {
        match self.bearer() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// GET wrapper: statuses in `allowed` pass through, 401 signals that the
    /// caller should refresh, anything else means the portal misbehaved.
    async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
        allowed: &[StatusCode],
    ) -> Result<Response> {
        let mut request = self.http.request(Method::GET, url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = self.http.send(self.with_bearer(request)).await?;
        Self::check_status(response, allowed).await
    }

    /// POST wrapper with the same allow-list contract as [`Self::get`].
    async fn post_form<T>(&self, url: &str, form: &T, allowed: &[StatusCode]) -> Result<Response>
    where
        T: Serialize + ?Sized + Sync,
    {
        let request = self.http.request(Method::POST, url).form(form);
        let response = self.http.send(self.with_bearer(request)).await?;
        Self::check_status(response, allowed).await
    }

    async fn post_json<T>(&self, url: &str, body: &T, allowed: &[StatusCode]) -> Result<Response>
    where
        T: Serialize + ?Sized + Sync,
    {
        let request = self.http.request(Method::POST, url).json(body);
        let response = self.http.send(self.with_bearer(request)).await?;
        Self::check_status(response, allowed).await
    }

    async fn check_status(response: Response, allowed: &[StatusCode]) -> Result<Response> {
        let status = response.status();
        if allowed.contains(&status) {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ImpfbotError::RefreshNeeded { status: status.as_u16(), body });
        }
        Err(ImpfbotError::Contract(format!("unexpected status {status}: {body}")))
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T> {
        response
            .json()
            .await
            .map_err(|err| ImpfbotError::Contract(format!("unexpected response shape: {err}")))
    }

    /// Fetch the authorization page and locate the login form's target.
    async fn login_form_action(&self) -> Result<String> {
        let query = [
            ("client_id", self.config.client_id.clone()),
            ("redirect_uri", self.config.redirect_uri.clone()),
            ("response_mode", "fragment".to_string()),
            ("response_type", "code".to_string()),
            ("scope", "openid".to_string()),
        ];
        let response = self.get(&self.config.authorization_endpoint(), &query, ALLOW_OK).await?;
        let body = response
            .text()
            .await
            .map_err(|err| ImpfbotError::Network(format!("failed to read login page: {err}")))?;
        let action = login_page::form_action(&body, &self.config.login_page_title)?;
        debug!(action = %action, "using login form action");
        Ok(action)
    }

    async fn exchange_at_token_endpoint<T>(&self, form: &T) -> Result<Authentication>
    where
        T: Serialize + ?Sized + Sync,
    {
        let response = self.post_form(&self.config.token_endpoint(), form, ALLOW_OK).await?;
        let token: TokenResponse = Self::json(response).await?;
        token.into_authentication()
    }

    /// Resolve the session's citizen, at most once per connector instance.
    async fn citizen(&self) -> Result<Citizen> {
        self.citizen
            .get_or_try_init(|| async {
                let response = self.get(&self.config.citizens_endpoint(), &[], ALLOW_OK).await?;
                let citizens: Vec<Citizen> = Self::json(response).await?;
                match citizens.as_slice() {
                    [citizen] => {
                        debug!(citizen = %citizen.id, "using citizen");
                        Ok(citizen.clone())
                    }
                    other => Err(ImpfbotError::Contract(format!(
                        "expected exactly one citizen, portal returned {}",
                        other.len()
                    ))),
                }
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl PortalSession for PortalConnector {
    async fn login(&self, payload: &LoginPayload) -> Result<String> {
        let action = self.login_form_action().await?;
        let response = self.post_form(&action, payload, ALLOW_LOGIN).await?;

        let final_url = response.url().clone();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|err| ImpfbotError::Network(format!("failed to read login response: {err}")))?;

        match login_page::login_failure(&body, &self.config.invalid_credentials_text)? {
            Some(LoginFailure::InvalidCredentials) => Err(ImpfbotError::InvalidCredentials),
            Some(LoginFailure::Rejected(errors)) => Err(ImpfbotError::LoginRejected(errors)),
            None => {
                let redirect = match location {
                    Some(value) => final_url.join(&value).map_err(|err| {
                        ImpfbotError::Contract(format!("unparseable redirect URL [{value}]: {err}"))
                    })?,
                    None => final_url,
                };
                let code = authorization_code(&redirect)?;
                debug!(
                    username = payload.get("username").map_or("", String::as_str),
                    "successfully logged in"
                );
                Ok(code)
            }
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<Authentication> {
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        self.exchange_at_token_endpoint(&form).await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<Authentication> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];
        self.exchange_at_token_endpoint(&form).await
    }

    fn authenticate(&self, authentication: &Authentication) {
        if let Ok(mut guard) = self.bearer.lock() {
            *guard = Some(authentication.access_token.clone());
        }
    }

    async fn current_appointment(&self) -> Result<Appointment> {
        let citizen = self.citizen().await?;
        let response =
            self.get(&self.config.appointments_endpoint(&citizen.id), &[], ALLOW_OK).await?;
        let listing: AppointmentListing = Self::json(response).await?;
        let appointment = Appointment::from_listing(&listing)?;
        debug!(appointment = ?appointment, "currently booked");
        Ok(appointment)
    }

    async fn next_appointment(&self, first_day: NaiveDate) -> Result<Appointment> {
        let citizen = self.citizen().await?;
        let query = [
            ("timeOfDay", "ALL_DAY".to_string()),
            ("lastDate", first_day.format("%Y-%m-%d").to_string()),
            ("lastTime", "00:00".to_string()),
        ];
        let response = self
            .get(
                &self.config.next_appointment_endpoint(&citizen.id),
                &query,
                ALLOW_OK_OR_NOT_FOUND,
            )
            .await?;
        let body: NextAppointmentResponse = Self::json(response).await?;
        let appointment = Appointment::from_next_response(&body)?;
        debug!(day = %first_day, appointment = ?appointment, "probed next appointment");
        Ok(appointment)
    }

    async fn appointments_in_range(
        &self,
        first_day: NaiveDate,
        days: u32,
    ) -> Result<HashSet<Appointment>> {
        let mut found = HashSet::new();
        for offset in 0..=days {
            let day =
                first_day.checked_add_days(Days::new(u64::from(offset))).ok_or_else(|| {
                    ImpfbotError::InvalidInput(format!(
                        "scan range overflows the calendar at {first_day} + {offset} days"
                    ))
                })?;
            let appointment = self.next_appointment(day).await?;
            if appointment.is_scheduled() {
                found.insert(appointment);
            }
        }
        Ok(found)
    }

    async fn book_appointment(&self, appointment: &Appointment) -> Result<()> {
        let Appointment::Scheduled { site, date_time } = appointment else {
            return Err(ImpfbotError::InvalidInput(
                "cannot book the no-appointment sentinel".to_string(),
            ));
        };
        let citizen = self.citizen().await?;
        let request =
            BookingRequest::for_slot(site, *date_time, zone_offset(self.timezone, *date_time)?);
        self.post_json(&self.config.appointments_endpoint(&citizen.id), &request, ALLOW_OK)
            .await?;
        debug!(site = %site, date_time = %date_time, "booked appointment");
        Ok(())
    }
}

/// Extract the single authorization code from a redirect URL's fragment.
fn authorization_code(url: &Url) -> Result<String> {
    let fragment = url
        .fragment()
        .ok_or_else(|| ImpfbotError::Contract(format!("redirect URL [{url}] has no fragment")))?;
    let mut codes = url::form_urlencoded::parse(fragment.as_bytes())
        .filter(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned());
    match (codes.next(), codes.next()) {
        (Some(code), None) => Ok(code),
        (None, _) => {
            Err(ImpfbotError::Contract("redirect fragment has no authorization code".to_string()))
        }
        (Some(_), Some(_)) => Err(ImpfbotError::Contract(
            "redirect fragment has more than one authorization code".to_string(),
        )),
    }
}

/// Render the portal timezone's UTC offset at a local time as `+HH:00`.
///
/// The portal's zoneOffset format carries whole hours only; sub-hour offsets
/// would truncate here. Exact for Europe/Berlin.
fn zone_offset(timezone: Tz, date_time: NaiveDateTime) -> Result<String> {
    let offset = timezone.offset_from_local_datetime(&date_time).earliest().ok_or_else(|| {
        ImpfbotError::InvalidInput(format!("[{date_time}] does not exist in {timezone}"))
    })?;
    let hours = offset.fix().local_minus_utc() / 3600;
    let sign = if hours < 0 { '-' } else { '+' };
    Ok(format!("{}{:02}:00", sign, hours.abs()))
}

/// Opens a fresh [`PortalConnector`] per service call.
pub struct PortalSessionFactory {
    config: Arc<PortalConfig>,
}

impl PortalSessionFactory {
    /// Create a factory over the given configuration.
    pub const fn new(config: Arc<PortalConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for PortalSessionFactory {
    async fn open_session(&self) -> Result<Box<dyn PortalSession>> {
        Ok(Box::new(PortalConnector::new(self.config.clone())?))
    }
}
