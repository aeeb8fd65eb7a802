pub mod analyze;
pub mod rebuild;
