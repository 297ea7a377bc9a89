pub mod assessment_dto;
pub mod company_dto;
