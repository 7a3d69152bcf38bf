pub mod comments;
pub mod scope;
pub mod surveys;
