//! Handler builders and associated traits.
//!
//! Builders collect user configuration, validate it, and produce a handler
//! ready to be plugged into a logging pipeline.

use std::io;

use thiserror::Error;

pub mod mailgun_builder;

pub use mailgun_builder::MailgunHandlerBuilder;

/// Errors that may occur while building a handler.
#[derive(Debug, Error)]
pub enum HandlerBuildError {
    /// Invalid user supplied configuration.
    #[error("invalid handler configuration: {0}")]
    InvalidConfig(String),
    /// Underlying I/O error whilst reading configuration.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The TLS backend could not be initialised.
    #[error("failed to initialise TLS: {0}")]
    Tls(#[from] native_tls::Error),
}

/// Trait implemented by all handler builders.
pub trait HandlerBuilderTrait: Send + Sync {
    /// Concrete handler produced by the builder.
    type Handler;

    /// Validate the configuration and build the handler.
    fn build_inner(&self) -> Result<Self::Handler, HandlerBuildError>;
}
