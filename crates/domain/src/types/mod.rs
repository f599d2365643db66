//! Domain data types for the vaccination portal

pub mod appointment;
pub mod auth;
pub mod citizen;

use std::collections::HashMap;

pub use appointment::{
    Appointment, AppointmentListing, AppointmentSlot, BookingRequest, FutureAppointment,
    NextAppointmentResponse, ReminderChannel,
};
pub use auth::{Authentication, TokenResponse};
pub use citizen::Citizen;

/// Opaque login form payload supplied by a credential source.
///
/// Forwarded to the portal's login form as-is and never retained beyond the
/// single login call.
pub type LoginPayload = HashMap<String, String>;
