//! Appointment entity and the portal's appointment wire types

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::{ImpfbotError, Result};

/// A bookable vaccination slot, or the distinguished "no slot" sentinel.
///
/// The two-variant shape makes a partially populated appointment
/// unrepresentable: either both site and time are present, or neither is.
/// `NoAppointment` compares equal only to `NoAppointment`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Appointment {
    Scheduled { site: String, date_time: NaiveDateTime },
    NoAppointment,
}

impl Appointment {
    /// Create a scheduled appointment.
    #[must_use]
    pub fn scheduled(site: impl Into<String>, date_time: NaiveDateTime) -> Self {
        Self::Scheduled { site: site.into(), date_time }
    }

    /// Whether this is a real slot rather than the sentinel.
    #[must_use]
    pub const fn is_scheduled(&self) -> bool {
        matches!(self, Self::Scheduled { .. })
    }

    /// Build an appointment from the next-appointment endpoint's body.
    ///
    /// A body without `siteId` (the portal's 404 shape) maps to
    /// [`Appointment::NoAppointment`]. A `siteId` without date and time is a
    /// contract violation, not a sentinel.
    pub fn from_next_response(response: &NextAppointmentResponse) -> Result<Self> {
        let Some(site) = &response.site_id else {
            return Ok(Self::NoAppointment);
        };
        let date = response.vaccination_date.ok_or_else(|| {
            ImpfbotError::Contract("next-appointment response missing vaccinationDate".to_string())
        })?;
        let time = response.vaccination_time.as_deref().ok_or_else(|| {
            ImpfbotError::Contract("next-appointment response missing vaccinationTime".to_string())
        })?;
        Ok(Self::Scheduled { site: site.clone(), date_time: date.and_time(parse_portal_time(time)?) })
    }

    /// Build an appointment from the appointments-listing body.
    ///
    /// An empty `futureAppointments` array yields the sentinel; otherwise the
    /// first entry's slot is taken. The portal does not document the array's
    /// ordering, so "first" is exactly that, not "earliest".
    pub fn from_listing(listing: &AppointmentListing) -> Result<Self> {
        match listing.future_appointments.first() {
            None => Ok(Self::NoAppointment),
            Some(entry) => {
                let slot = &entry.slot_id;
                Ok(Self::Scheduled {
                    site: slot.site_id.clone(),
                    date_time: slot.date.and_time(parse_portal_time(&slot.time)?),
                })
            }
        }
    }

}

/// Times arrive as `HH:MM`, occasionally with seconds.
fn parse_portal_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|err| ImpfbotError::Contract(format!("unparseable portal time [{value}]: {err}")))
}

/// Body of the next-appointment endpoint.
///
/// All fields are optional because the portal answers a probe with no free
/// slot (HTTP 404) with a body that simply lacks them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextAppointmentResponse {
    pub site_id: Option<String>,
    pub vaccination_date: Option<NaiveDate>,
    pub vaccination_time: Option<String>,
}

/// Body of the appointments-listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListing {
    #[serde(default)]
    pub future_appointments: Vec<FutureAppointment>,
}

/// One entry of `futureAppointments`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FutureAppointment {
    pub slot_id: AppointmentSlot,
}

/// Slot identifier nested inside a listing entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSlot {
    pub site_id: String,
    pub date: NaiveDate,
    pub time: String,
}

/// Booking payload POSTed to the citizen's appointments collection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub site_id: String,
    pub vaccination_date: String,
    pub vaccination_time: String,
    pub zone_offset: String,
    pub reminder_channel: ReminderChannel,
}

/// Reminder flags; the portal is always asked for both channels.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderChannel {
    pub reminder_by_sms: bool,
    pub reminder_by_email: bool,
}

impl BookingRequest {
    /// Build the payload for a slot.
    ///
    /// `zone_offset` is the portal timezone's UTC offset at the slot's local
    /// time, already rendered in the portal's `+HH:00` format.
    #[must_use]
    pub fn for_slot(site: &str, date_time: NaiveDateTime, zone_offset: String) -> Self {
        Self {
            site_id: site.to_string(),
            vaccination_date: date_time.date().format("%Y-%m-%d").to_string(),
            vaccination_time: date_time.time().format("%H:%M").to_string(),
            zone_offset,
            reminder_channel: ReminderChannel { reminder_by_sms: true, reminder_by_email: true },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::NaiveDate;

    use super::*;

    fn slot_datetime() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 12, 13)
            .and_then(|d| d.and_hms_opt(15, 0, 0))
            .expect("valid test datetime")
    }

    #[test]
    fn next_response_with_site_becomes_scheduled() {
        let response: NextAppointmentResponse = serde_json::from_str(
            r#"{"siteId":"site id","vaccinationDate":"2021-12-13","vaccinationTime":"15:00"}"#,
        )
        .expect("valid response");

        let appointment = Appointment::from_next_response(&response).expect("parseable");
        assert_eq!(appointment, Appointment::scheduled("site id", slot_datetime()));
    }

    #[test]
    fn next_response_without_site_is_the_sentinel() {
        let response: NextAppointmentResponse =
            serde_json::from_str("{}").expect("valid response");

        assert_eq!(
            Appointment::from_next_response(&response).expect("parseable"),
            Appointment::NoAppointment
        );
    }

    #[test]
    fn next_response_with_site_but_no_time_is_a_contract_violation() {
        let response: NextAppointmentResponse =
            serde_json::from_str(r#"{"siteId":"site id","vaccinationDate":"2021-12-13"}"#)
                .expect("valid response");

        let err = Appointment::from_next_response(&response).expect_err("half a slot");
        assert!(matches!(err, ImpfbotError::Contract(_)));
    }

    #[test]
    fn sentinel_equals_only_the_sentinel() {
        assert_eq!(Appointment::NoAppointment, Appointment::NoAppointment);
        assert_ne!(Appointment::NoAppointment, Appointment::scheduled("site", slot_datetime()));
        assert_ne!(Appointment::scheduled("site", slot_datetime()), Appointment::NoAppointment);
    }

    #[test]
    fn equal_slots_collapse_in_a_set() {
        let mut set = HashSet::new();
        set.insert(Appointment::scheduled("site id", slot_datetime()));
        set.insert(Appointment::scheduled("site id", slot_datetime()));
        set.insert(Appointment::NoAppointment);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn listing_takes_the_first_future_entry() {
        let listing: AppointmentListing = serde_json::from_str(
            r#"{"futureAppointments":[
                {"slotId":{"siteId":"site id","date":"2021-12-13","time":"15:00"}},
                {"slotId":{"siteId":"other site","date":"2021-12-14","time":"09:00"}}
            ]}"#,
        )
        .expect("valid listing");

        let appointment = Appointment::from_listing(&listing).expect("parseable");
        assert_eq!(appointment, Appointment::scheduled("site id", slot_datetime()));
    }

    #[test]
    fn empty_listing_is_the_sentinel() {
        let listing: AppointmentListing =
            serde_json::from_str(r#"{"futureAppointments":[],"pastAppointments":[]}"#)
                .expect("valid listing");

        assert_eq!(
            Appointment::from_listing(&listing).expect("parseable"),
            Appointment::NoAppointment
        );
    }

    #[test]
    fn booking_request_serializes_in_portal_shape() {
        let request = BookingRequest::for_slot("site id", slot_datetime(), "+01:00".to_string());
        let json = serde_json::to_value(&request).expect("serializable");

        assert_eq!(
            json,
            serde_json::json!({
                "siteId": "site id",
                "vaccinationDate": "2021-12-13",
                "vaccinationTime": "15:00",
                "zoneOffset": "+01:00",
                "reminderChannel": {"reminderBySms": true, "reminderByEmail": true}
            })
        );
    }

    #[test]
    fn portal_times_may_carry_seconds() {
        assert_eq!(
            parse_portal_time("15:00:00").expect("parseable"),
            NaiveTime::from_hms_opt(15, 0, 0).expect("valid time")
        );
        assert!(parse_portal_time("3pm").is_err());
    }
}
