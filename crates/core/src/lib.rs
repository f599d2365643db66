//! # Impfbot Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the portal session and credential
//!   sources
//! - The appointment service façade that orchestrates session lifetimes
//!
//! ## Architecture Principles
//! - Only depends on `impfbot-domain`
//! - No HTTP or filesystem code
//! - All external dependencies via traits

pub mod booking;

// Re-export specific items to avoid ambiguity
pub use booking::ports::{CredentialSource, PortalSession, SessionFactory};
pub use booking::AppointmentService;
