pub mod comments;
pub mod roles;
pub mod surveys;
