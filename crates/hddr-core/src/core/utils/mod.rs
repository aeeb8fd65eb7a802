pub mod codes;
pub mod geometry;
