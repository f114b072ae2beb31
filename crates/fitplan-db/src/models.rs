use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted plan -- one row per successful generation.
///
/// Serializes with the identifier under `_id` and `created_at` as an
/// RFC 3339 string, which is the shape the HTTP API returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PlanDocument {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub present_weight: f64,
    pub expected_weight: f64,
    pub target_months: i32,
    /// Day name to named numeric fields, as returned by the model.
    pub plan: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Column values for a plan that has not been inserted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlanDocument {
    pub present_weight: f64,
    pub expected_weight: f64,
    pub target_months: i32,
    pub plan: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl NewPlanDocument {
    /// Attach a store-assigned identifier.
    pub fn into_document(self, id: Uuid) -> PlanDocument {
        PlanDocument {
            id,
            present_weight: self.present_weight,
            expected_weight: self.expected_weight,
            target_months: self.target_months,
            plan: self.plan,
            created_at: self.created_at,
        }
    }
}
