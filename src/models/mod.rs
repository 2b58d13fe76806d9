pub mod question;
pub mod quiz;
pub mod quiz_attempt;
pub mod quiz_option;
pub mod session;
pub mod user_answer;
