pub mod aggregate;
pub mod config;
pub mod error;
pub mod links;
pub mod narrative;
pub mod protocol;
pub mod selection;
pub mod sequence;
pub mod server;
pub mod story;
pub mod transport;
pub mod tree;
pub mod types;
pub mod views;

#[cfg(test)]
mod fixtures;
