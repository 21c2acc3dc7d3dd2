//! # API Maker
//!
//! A generic resource lifecycle pipeline for building RESTful APIs in Rust.
//!
//! ## Features
//!
//! - **Five operations**: Create, Update, View, List and Delete for any model
//! - **Fixed stage order**: authenticate, authorize, bind, project, hooks,
//!   persist, respond; the first failure stops the operation
//! - **Pluggable security**: optional authenticate/authorize predicates per operation
//! - **Lifecycle hooks**: callbacks with key/value parameters around persistence
//! - **Two-phase binding**: automatic same-name field copy, then custom finalization
//! - **Uniform envelope**: one JSON response shape with pagination metadata
//! - **Configuration-Based**: per-resource auth policies via YAML configuration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use api_maker::prelude::*;
//!
//! #[async_trait]
//! impl Model for Product {
//!     async fn save(&mut self) -> Result<()> { /* ... */ }
//!     async fn get_one(&mut self, id: &str) -> Result<()> { /* ... */ }
//!     async fn list(&self, filter: &dyn Filter, pagination: &Pagination) -> Result<Listing<Self>> { /* ... */ }
//!     async fn remove(&mut self, id: &str) -> Result<()> { /* ... */ }
//! }
//!
//! ServerBuilder::new()
//!     .with_config_file("api.yaml")?
//!     .register(Resource::<Product, AddProductForm, ProductFilter>::new("product", Product::default))
//!     .serve()
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod pipeline;
pub mod server;
pub mod storage;
pub mod telemetry;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{
        auth::{AuthContext, AuthPolicy, AuthProvider, HeaderAuthProvider, NoAuthProvider},
        context::RequestContext,
        envelope::{Envelope, MetaData, to_map},
        error::PipelineError,
        hooks::{Hook, HookFn, HookParam, HookPoint},
        model::{Filter, Form, Listing, Model, NoFilter},
        operation::Operation,
        pagination::Pagination,
        security::{Guard, PolicyGuard, RequireIdentity, Security},
    };

    // === Pipeline ===
    pub use crate::pipeline::{
        ApiService, CreateRequest, DeleteRequest, ListRequest, ServiceRequest, UpdateRequest,
        ViewRequest,
    };

    // === Storage ===
    pub use crate::storage::InMemoryStore;

    // === Config ===
    pub use crate::config::{ApiConfig, ResourceAuthConfig, ResourceConfig, ServerConfig};

    // === Server ===
    pub use crate::server::{Resource, ResourceDescriptor, ResourceRegistry, ServerBuilder};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use validator::Validate;
}
