//! Green Box factory assistant server - Library exports for testing

pub mod api;
pub mod config;
pub mod core;
pub mod infrastructure;

#[cfg(test)]
pub(crate) mod test_support;
