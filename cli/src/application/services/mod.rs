//! Application services — use-case orchestration.
//!
//! Each service module implements a single step of a deployment by composing
//! domain logic with port trait calls. Services import only from
//! `crate::domain` and `crate::application::ports` — never from
//! `crate::infra`, `crate::commands`, or `crate::output`.

pub mod code_sync;
pub mod deploy;
pub mod environment;
pub mod host;
pub mod launch;
pub mod prune;
pub mod rollover;
pub mod version_guard;
