//! Blocking TCP front end for a capture session

pub mod client;
pub use client::Client;

pub mod server;
pub use server::Server;
