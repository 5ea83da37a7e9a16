//! Deployment environments, redacted credentials, and the shared token manager.

pub mod environment;
pub mod secret;
pub mod token;

pub use environment::*;
pub use secret::*;
pub use token::*;
