//! Appointment discovery and booking orchestration

pub mod ports;
pub mod service;

pub use service::AppointmentService;
