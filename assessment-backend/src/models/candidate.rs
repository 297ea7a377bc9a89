use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Interview track a candidate answers; selects question set and scoring emphasis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileType {
    Administrative,
    Field,
}

impl ProfileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileType::Administrative => "ADMINISTRATIVE",
            ProfileType::Field => "FIELD",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ADMINISTRATIVE" | "ADMIN" => Some(ProfileType::Administrative),
            "FIELD" | "OPERATIVE" => Some(ProfileType::Field),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// A person who answered one interview. Keyed by normalized contact email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: String,
    pub company_code: String,
    pub profile_type: ProfileType,
    pub location: Option<GeoLocation>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Candidate {
    pub fn identity_key(email: &str) -> String {
        email.trim().to_lowercase()
    }
}
