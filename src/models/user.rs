use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

pub const USERS_COLLECTION: &str = "users";

/// The slice of a platform user document the payment bridge reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub login: String,

    #[serde(default)]
    pub blocked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_until: Option<DateTime>,

    /// Transaction ids whose entitlement has already been applied.
    #[serde(default)]
    pub granted_transactions: Vec<String>,
}
