pub mod admin_dto;
pub mod attempt_dto;
pub mod auth_dto;
pub mod result_dto;
