//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod docker;
pub mod environment;
pub mod error;
pub mod identity;
pub mod instance;
pub mod manifest;
pub mod shell;

pub use config::{DeployKind, DeploymentConfig, DeploymentDocument, DockerOptions, RemoteTarget};
pub use environment::Environment;
pub use error::{ConfigError, ConnectionError, ExecutionError, VersionGuardError};
pub use identity::InstanceIdentity;
pub use instance::Instance;
