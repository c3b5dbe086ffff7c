pub mod ids;
pub mod log;
pub mod plan;
pub mod provider;
pub mod tools;
