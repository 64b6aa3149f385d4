//! Error types surfaced by the battle runtime.
//!
//! Handler and passive failures never leave the runtime: they are logged and
//! counted at the fault wall that caught them. Only configuration problems
//! reach callers, through [`RuntimeError`].
use std::any::Any;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Result type returned by event handlers.
pub type HandlerResult = std::result::Result<(), HandlerError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid diminishing returns table")]
    DiminishingReturns(#[from] battle_core::ConfigError),

    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(String),
}

/// Failure reported by (or caught around) a single event handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::Panicked(panic_message(payload.as_ref()))
    }
}

/// Failure reported by a passive plugin hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("passive `{passive}` failed: {message}")]
pub struct PassiveError {
    pub passive: String,
    pub message: String,
}

impl PassiveError {
    pub fn new(passive: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            passive: passive.into(),
            message: message.into(),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
