//! Core types for the Folio control plane: models, plan catalog,
//! configuration, and the error taxonomy shared by every crate.

pub mod config;
pub mod error;
pub mod models;
pub mod plan;

pub use config::Config;
pub use error::{
    AppError, DestructionError, DestructionPhase, ErrorMetadata, LogLevel, ProvisioningError,
    ProvisioningPhase,
};
