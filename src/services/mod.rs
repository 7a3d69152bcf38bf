pub mod audit;
pub mod content;
