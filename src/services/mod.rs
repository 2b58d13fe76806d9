pub mod generator_service;
pub mod grading_service;
pub mod history_service;
pub mod question_normalizer;
pub mod quiz_service;
