pub mod generator_dto;
pub mod quiz_dto;
