pub mod comments;
pub mod extract;
pub mod health;
pub mod surveys;
