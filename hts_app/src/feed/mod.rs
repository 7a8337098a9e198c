pub mod fetch;
pub mod input;
