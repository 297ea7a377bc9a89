use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    Free,
    Premium,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "FREE",
            Plan::Premium => "PREMIUM",
        }
    }

    /// Unknown stored values read as FREE; the ledger never writes anything else.
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("PREMIUM") {
            Plan::Premium
        } else {
            Plan::Free
        }
    }

    /// Plan after a grant of `amount` credits. Never downgrades.
    pub fn after_grant(self, amount: i64, premium_threshold: i64) -> Self {
        if self == Plan::Premium || amount >= premium_threshold {
            Plan::Premium
        } else {
            Plan::Free
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub code: String,
    pub name: String,
    pub email: String,
    pub industry: Option<String>,
    pub credits: i64,
    pub plan: Plan,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCompany {
    pub code: String,
    pub name: String,
    pub email: String,
    pub industry: Option<String>,
    pub credits: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premium_is_sticky_and_threshold_inclusive() {
        assert_eq!(Plan::Free.after_grant(10, 50), Plan::Free);
        assert_eq!(Plan::Free.after_grant(50, 50), Plan::Premium);
        assert_eq!(Plan::Premium.after_grant(1, 50), Plan::Premium);
    }
}
