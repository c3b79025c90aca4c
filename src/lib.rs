pub mod encoding;
pub mod errors;
pub mod forms;
pub mod models;
pub mod repositories;
pub mod services;

#[cfg(test)]
pub mod test_utils;
