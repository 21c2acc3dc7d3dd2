//! Route registration for one resource
//!
//! A [`Resource`] wires the five operations of a model into an axum router:
//!
//! | Method   | Path                  | Operation |
//! |----------|-----------------------|-----------|
//! | `POST`   | `/{name}/create`      | Create    |
//! | `PUT`    | `/{name}/update/{id}` | Update    |
//! | `GET`    | `/{name}/list`        | List      |
//! | `GET`    | `/{name}/view/{id}`   | View      |
//! | `DELETE` | `/{name}/delete/{id}` | Delete    |
//!
//! Every request gets a fresh model from the resource's factory. Security
//! set on the resource wins over the policies found in [`ApiConfig`].

use axum::Router;
use axum::extract::State;
use axum::routing::{delete, get, post, put};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use super::registry::ResourceDescriptor;
use crate::config::ApiConfig;
use crate::core::context::RequestContext;
use crate::core::envelope::Envelope;
use crate::core::hooks::Hook;
use crate::core::model::{Filter, Form, Model, NoFilter};
use crate::core::operation::Operation;
use crate::core::security::Security;
use crate::pipeline::{
    ApiService, CreateRequest, DeleteRequest, ListRequest, UpdateRequest, ViewRequest,
};

type Factory<M> = Arc<dyn Fn() -> M + Send + Sync>;

/// Hooks attached to every request of a resource
pub struct ResourceHooks<M> {
    pub before_save: Hook<M>,
    pub after_save: Hook<M>,
    pub before_list: Hook<M>,
    pub after_list: Hook<M>,
    pub after_find: Hook<M>,
    pub before_remove: Hook<M>,
    pub after_remove: Hook<M>,
}

impl<M> Default for ResourceHooks<M> {
    fn default() -> Self {
        Self {
            before_save: Hook::default(),
            after_save: Hook::default(),
            before_list: Hook::default(),
            after_list: Hook::default(),
            after_find: Hook::default(),
            before_remove: Hook::default(),
            after_remove: Hook::default(),
        }
    }
}

impl<M> Clone for ResourceHooks<M> {
    fn clone(&self) -> Self {
        Self {
            before_save: self.before_save.clone(),
            after_save: self.after_save.clone(),
            before_list: self.before_list.clone(),
            after_list: self.after_list.clone(),
            after_find: self.after_find.clone(),
            before_remove: self.before_remove.clone(),
            after_remove: self.after_remove.clone(),
        }
    }
}

/// Descriptor exposing model `M` with form `F` and list filter `L`
pub struct Resource<M, F, L = NoFilter> {
    service: ApiService,
    factory: Factory<M>,
    hooks: ResourceHooks<M>,
    security: HashMap<Operation, Security>,
    types: PhantomData<fn() -> (F, L)>,
}

impl<M, F, L> Resource<M, F, L>
where
    M: Model,
    F: Form<M> + 'static,
    L: Filter + DeserializeOwned + 'static,
{
    /// Resource named `name` building each request's model with `factory`
    pub fn new(name: impl Into<String>, factory: impl Fn() -> M + Send + Sync + 'static) -> Self {
        Self {
            service: ApiService::new(name),
            factory: Arc::new(factory),
            hooks: ResourceHooks::default(),
            security: HashMap::new(),
            types: PhantomData,
        }
    }

    pub fn service(&self) -> &ApiService {
        &self.service
    }

    /// Override the configured security of one operation
    pub fn with_security(mut self, operation: Operation, security: Security) -> Self {
        self.security.insert(operation, security);
        self
    }

    pub fn before_save(mut self, hook: Hook<M>) -> Self {
        self.hooks.before_save = hook;
        self
    }

    pub fn after_save(mut self, hook: Hook<M>) -> Self {
        self.hooks.after_save = hook;
        self
    }

    pub fn before_list(mut self, hook: Hook<M>) -> Self {
        self.hooks.before_list = hook;
        self
    }

    pub fn after_list(mut self, hook: Hook<M>) -> Self {
        self.hooks.after_list = hook;
        self
    }

    pub fn after_find(mut self, hook: Hook<M>) -> Self {
        self.hooks.after_find = hook;
        self
    }

    pub fn before_remove(mut self, hook: Hook<M>) -> Self {
        self.hooks.before_remove = hook;
        self
    }

    pub fn after_remove(mut self, hook: Hook<M>) -> Self {
        self.hooks.after_remove = hook;
        self
    }

    /// Build the five operation routes
    pub fn routes(&self, config: &ApiConfig) -> Router {
        let name = self.service.name().to_string();

        let security = Operation::ALL
            .into_iter()
            .map(|op| {
                let security = self
                    .security
                    .get(&op)
                    .cloned()
                    .unwrap_or_else(|| config.security_for(&name, op));
                (op, security)
            })
            .collect();

        let state = Arc::new(ResourceState::<M, F, L> {
            service: self.service.clone(),
            factory: Arc::clone(&self.factory),
            hooks: self.hooks.clone(),
            security,
            types: PhantomData,
        });

        Router::new()
            .route(&format!("/{}/create", name), post(create::<M, F, L>))
            .route(&format!("/{}/update/{{id}}", name), put(update::<M, F, L>))
            .route(&format!("/{}/list", name), get(list::<M, F, L>))
            .route(&format!("/{}/view/{{id}}", name), get(view::<M, F, L>))
            .route(&format!("/{}/delete/{{id}}", name), delete(remove::<M, F, L>))
            .with_state(state)
    }
}

impl<M, F, L> ResourceDescriptor for Resource<M, F, L>
where
    M: Model,
    F: Form<M> + 'static,
    L: Filter + DeserializeOwned + 'static,
{
    fn name(&self) -> &str {
        self.service.name()
    }

    fn build_routes(&self, config: &ApiConfig) -> Router {
        self.routes(config)
    }
}

/// Per-resource state shared by the route handlers
struct ResourceState<M, F, L> {
    service: ApiService,
    factory: Factory<M>,
    hooks: ResourceHooks<M>,
    security: HashMap<Operation, Security>,
    types: PhantomData<fn() -> (F, L)>,
}

impl<M, F, L> ResourceState<M, F, L> {
    fn security(&self, operation: Operation) -> Security {
        self.security.get(&operation).cloned().unwrap_or_default()
    }
}

type SharedState<M, F, L> = State<Arc<ResourceState<M, F, L>>>;

async fn create<M, F, L>(State(state): SharedState<M, F, L>, ctx: RequestContext) -> Envelope
where
    M: Model,
    F: Form<M> + 'static,
    L: Filter + DeserializeOwned + 'static,
{
    let mut model = (state.factory)();
    let req = CreateRequest::<M, F>::new(&ctx, &mut model)
        .with_security(state.security(Operation::Create))
        .before_save(state.hooks.before_save.clone())
        .after_save(state.hooks.after_save.clone());

    state.service.create(req).await
}

async fn update<M, F, L>(State(state): SharedState<M, F, L>, ctx: RequestContext) -> Envelope
where
    M: Model,
    F: Form<M> + 'static,
    L: Filter + DeserializeOwned + 'static,
{
    let mut model = (state.factory)();
    let req = UpdateRequest::<M, F>::new(&ctx, &mut model)
        .with_security(state.security(Operation::Update))
        .before_save(state.hooks.before_save.clone())
        .after_save(state.hooks.after_save.clone());

    state.service.update(req).await
}

async fn list<M, F, L>(State(state): SharedState<M, F, L>, ctx: RequestContext) -> Envelope
where
    M: Model,
    F: Form<M> + 'static,
    L: Filter + DeserializeOwned + 'static,
{
    let mut model = (state.factory)();
    let req = ListRequest::<M, L>::new(&ctx, &mut model)
        .with_security(state.security(Operation::List))
        .before_list(state.hooks.before_list.clone())
        .after_list(state.hooks.after_list.clone());

    state.service.list(req).await
}

async fn view<M, F, L>(State(state): SharedState<M, F, L>, ctx: RequestContext) -> Envelope
where
    M: Model,
    F: Form<M> + 'static,
    L: Filter + DeserializeOwned + 'static,
{
    let mut model = (state.factory)();
    let req = ViewRequest::new(&ctx, &mut model)
        .with_security(state.security(Operation::View))
        .after_find(state.hooks.after_find.clone());

    state.service.view(req).await
}

async fn remove<M, F, L>(State(state): SharedState<M, F, L>, ctx: RequestContext) -> Envelope
where
    M: Model,
    F: Form<M> + 'static,
    L: Filter + DeserializeOwned + 'static,
{
    let mut model = (state.factory)();
    let req = DeleteRequest::new(&ctx, &mut model)
        .with_security(state.security(Operation::Delete))
        .before_remove(state.hooks.before_remove.clone())
        .after_remove(state.hooks.after_remove.clone());

    state.service.delete(req).await
}
