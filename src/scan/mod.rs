pub mod registry;
pub mod scheduler;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
