use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Single-use voucher. `is_redeemed` flips false -> true exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditCode {
    pub code: String,
    pub amount: i64,
    pub is_redeemed: bool,
    pub redeemed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}
