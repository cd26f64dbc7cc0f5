pub mod permission;
pub mod types;
