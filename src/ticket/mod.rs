pub mod builder;
pub mod handler;
