//! Portal connector: session, login flow and resource access

pub mod connector;
mod login_page;

pub use connector::{PortalConnector, PortalSessionFactory};
