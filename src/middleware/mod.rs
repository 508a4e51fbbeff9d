//! Middleware components for request processing

pub mod validator;

pub use validator::{InputValidator, ValidationError};
