pub mod btle;
pub mod constants;
pub mod permission;
pub mod source;
pub mod types;
