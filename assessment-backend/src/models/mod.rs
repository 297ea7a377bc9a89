pub mod assessment;
pub mod candidate;
pub mod company;
pub mod credit_code;
pub mod job;
pub mod report;
