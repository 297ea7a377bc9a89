use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::candidate::ProfileType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub company_code: String,
    pub title: String,
    pub location: String,
    pub profile_type: ProfileType,
    pub description: Option<String>,
    pub active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}
