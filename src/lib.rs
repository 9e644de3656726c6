//! Signpost library exports for the binary and integration tests

pub mod core;
pub mod fetch;
pub mod site;
pub mod terminal;

#[cfg(test)]
pub mod test_support;
