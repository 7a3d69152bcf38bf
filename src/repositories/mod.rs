pub mod audit_logs;
pub mod comments;
pub mod profiles;
pub mod surveys;
