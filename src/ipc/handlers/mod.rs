pub mod attendance;
pub mod auth;
pub mod core;
pub mod grades;
