pub mod hook;
pub mod job;
pub mod repo;
