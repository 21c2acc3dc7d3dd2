//! Core module containing the pipeline's building blocks

pub mod auth;
pub mod binding;
pub mod context;
pub mod envelope;
pub mod error;
pub mod hooks;
pub mod model;
pub mod operation;
pub mod pagination;
pub mod security;

pub use auth::{AuthContext, AuthPolicy, AuthProvider, HeaderAuthProvider, NoAuthProvider};
pub use context::RequestContext;
pub use envelope::{Envelope, MetaData, to_map};
pub use error::PipelineError;
pub use hooks::{Hook, HookFn, HookParam, HookPoint};
pub use model::{Filter, Form, Listing, Model, NoFilter};
pub use operation::Operation;
pub use pagination::Pagination;
pub use security::{Guard, PolicyGuard, RequireIdentity, Security};
