//! HTTP routes

pub mod convert;

pub use convert::router;
