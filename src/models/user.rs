//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Document ID
    pub id: String,
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    #[serde(default)]
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Running sum of the user's activity emissions (kg CO2)
    #[serde(default)]
    pub total_emissions: f64,
}

/// Field name of [`User::total_emissions`] in Firestore.
pub const TOTAL_EMISSIONS_FIELD: &str = "totalEmissions";
