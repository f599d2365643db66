//! Citizen record resolved from the authenticated session

use serde::{Deserialize, Serialize};

/// The portal account's citizen, as returned by the current-citizens
/// endpoint. Extra response fields are ignored; only the identifier is
/// needed to address the appointment endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citizen {
    pub id: String,
}
