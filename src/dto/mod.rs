pub mod comments;
pub mod common;
pub mod surveys;
