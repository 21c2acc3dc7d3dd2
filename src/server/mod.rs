//! Server module for exposing resources over HTTP
//!
//! This module provides:
//! - [`Resource`]: the five operation routes of one model
//! - [`ResourceRegistry`]: every resource of the application
//! - [`ServerBuilder`]: health routes, auth provider, tracing and graceful
//!   shutdown around the registered resources

pub mod builder;
pub mod registry;
pub mod resource;

pub use builder::ServerBuilder;
pub use registry::{ResourceDescriptor, ResourceRegistry};
pub use resource::{Resource, ResourceHooks};
