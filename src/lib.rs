//! Core library for music-researcher
pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod genres;
pub mod mapper;
pub mod models;
pub mod researcher;
pub mod search;
pub mod server;
pub mod service;
pub mod session;

pub use context::RequestContext;
pub use error::{Error, ErrorKind};
pub use researcher::Researcher;
