pub mod aggregate;
pub mod boundary;
pub mod config;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod index;
pub mod output;
pub mod pipeline;
pub mod projection;
pub mod samples;
pub mod score;

pub use error::{GridError, Result};
