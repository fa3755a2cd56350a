pub mod delays;
pub mod import;
