use crate::models::candidate::ProfileType;
use crate::models::company::Plan;
use crate::utils::validation::non_blank;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterCompanyRequest {
    #[validate(custom(function = "non_blank"), length(max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub industry: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(custom(function = "non_blank"))]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PublishJobRequest {
    #[validate(custom(function = "non_blank"), length(max = 200))]
    pub title: String,
    #[validate(custom(function = "non_blank"))]
    pub location: String,
    pub profile_type: ProfileType,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusRequest {
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RedeemRequest {
    #[validate(custom(function = "non_blank"))]
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemResponse {
    pub amount: i64,
    pub new_balance: i64,
    pub new_plan: Plan,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IssueCodeRequest {
    #[validate(range(min = 1, max = 100000))]
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GrantCreditsRequest {
    #[validate(range(min = 1, max = 100000))]
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: i64,
    pub plan: Plan,
    pub upgraded: bool,
}
