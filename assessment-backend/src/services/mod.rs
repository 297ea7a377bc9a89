pub mod assessment_service;
pub mod company_service;
pub mod job_service;
pub mod ledger_service;
pub mod pipeline_service;
pub mod report_normalizer;
pub mod scoring_service;
pub mod unlock_service;
