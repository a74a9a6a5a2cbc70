//! Hierarchical, parameterized permission evaluator plus role expansion
//! engine.
//!
//! The [`authorization`] module is the whole of the subsystem; [`config`]
//! and [`logging`] are the ambient loading/observability surface around it.
//! Everything this crate does not own — identity flows, token signing,
//! session storage, persistence backends, the HTTP/CLI surface — is an
//! external collaborator specified only by the interfaces
//! [`authorization::repository`] and [`authorization::service`] consume.

#![forbid(unused_imports)]

pub mod authorization;
pub mod config;
pub mod logging;

pub use config::Config;