//! Resource lifecycle orchestrator
//!
//! [`ApiService`] runs the five operation kinds against any [`Model`]. Every
//! kind is a fixed chain of stages:
//!
//! | Kind   | Stages                                                                      |
//! |--------|-----------------------------------------------------------------------------|
//! | Create | authenticate, authorize, bind, project, beforesave, save, aftersave         |
//! | Update | authenticate, authorize, fetch, bind, project, beforesave, save, aftersave  |
//! | View   | authenticate, authorize, fetch, afterfind                                   |
//! | List   | authenticate, authorize, bind filter, beforelist, query, afterlist          |
//! | Delete | authenticate, authorize, beforeremove, remove, afterremove                  |
//!
//! A stage runs only if every stage before it succeeded. The first failure
//! becomes the error envelope; nothing after it runs, hooks included. The
//! orchestrator always answers with an [`Envelope`] and never retains the
//! model, the form or the context past the call.
//!
//! ```rust,ignore
//! let service = ApiService::new("product");
//! let envelope = service
//!     .create(
//!         CreateRequest::<Product, AddProductForm>::new(&ctx, &mut product)
//!             .with_security(Security::from_policy(AuthPolicy::Authenticated))
//!             .before_save(Hook::from_fn(classify)),
//!     )
//!     .await;
//! ```

mod request;

pub use request::{CreateRequest, DeleteRequest, ListRequest, ServiceRequest, UpdateRequest, ViewRequest};

use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::future::Future;
use tracing::{Instrument, debug};

use crate::core::binding::{bind_form, project};
use crate::core::context::RequestContext;
use crate::core::envelope::{Envelope, MetaData};
use crate::core::error::PipelineError;
use crate::core::hooks::{Hook, HookPoint};
use crate::core::model::{Filter, Form, Model};
use crate::core::operation::Operation;
use crate::core::pagination::Pagination;
use crate::core::security::Security;

/// Descriptor of one exposed resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiService {
    name: String,
}

impl ApiService {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Resource name, used as the data key of single-item responses
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Data key of list responses
    pub fn list_key(&self) -> String {
        format!("{}s", self.name)
    }

    /// Create a new resource from the request body
    pub async fn create<M, F>(&self, req: CreateRequest<'_, M, F>) -> Envelope
    where
        M: Model,
        F: Form<M>,
    {
        self.run(Operation::Create, self.create_stages(req)).await
    }

    /// Update the resource named by the `id` path parameter
    pub async fn update<M, F>(&self, req: UpdateRequest<'_, M, F>) -> Envelope
    where
        M: Model,
        F: Form<M>,
    {
        self.run(Operation::Update, self.update_stages(req)).await
    }

    /// Load the resource named by the `id` path parameter
    pub async fn view<M: Model>(&self, req: ViewRequest<'_, M>) -> Envelope {
        self.run(Operation::View, self.view_stages(req)).await
    }

    /// Load a filtered, paginated list of resources
    pub async fn list<M, L>(&self, req: ListRequest<'_, M, L>) -> Envelope
    where
        M: Model,
        L: Filter + DeserializeOwned,
    {
        self.run(Operation::List, self.list_stages(req)).await
    }

    /// Remove the resource named by the `id` path parameter
    pub async fn delete<M: Model>(&self, req: DeleteRequest<'_, M>) -> Envelope {
        self.run(Operation::Delete, self.delete_stages(req)).await
    }

    /// Dispatch a write request by operation kind
    ///
    /// Only [`Operation::Create`] and [`Operation::Update`] take a form;
    /// any other kind is rejected without running a stage.
    pub async fn request<M, F>(&self, operation: Operation, req: ServiceRequest<'_, M, F>) -> Envelope
    where
        M: Model,
        F: Form<M>,
    {
        match operation {
            Operation::Create => self.create(CreateRequest::from(req)).await,
            Operation::Update => self.update(UpdateRequest::from(req)).await,
            other => {
                self.run(other, async move {
                    Err(PipelineError::UnsupportedOperation { operation: other })
                })
                .await
            }
        }
    }

    async fn run<S>(&self, operation: Operation, stages: S) -> Envelope
    where
        S: Future<Output = Result<Envelope, PipelineError>>,
    {
        let span = tracing::info_span!("pipeline", resource = %self.name, operation = %operation);

        match stages.instrument(span.clone()).await {
            Ok(envelope) => {
                span.in_scope(|| debug!(code = envelope.code, "operation succeeded"));
                envelope
            }
            Err(err) => span.in_scope(|| {
                debug!(error_code = err.error_code(), "operation stopped");
                err.to_envelope()
            }),
        }
    }

    async fn create_stages<M, F>(&self, req: CreateRequest<'_, M, F>) -> Result<Envelope, PipelineError>
    where
        M: Model,
        F: Form<M>,
    {
        let CreateRequest {
            context,
            model,
            security,
            before_save,
            after_save,
            ..
        } = req;

        gate(&security, context).await?;

        let form = bind_form::<M, F>(context)?;
        project(&form, model)?;
        debug!(stage = "project", "form bound onto model");

        self.save_with_hooks(model, &before_save, &after_save, "add")
            .await?;

        Ok(Envelope::success(
            StatusCode::OK,
            format!("successfully added {}", self.name),
            Some(self.single(model)?),
            MetaData::default(),
        ))
    }

    async fn update_stages<M, F>(&self, req: UpdateRequest<'_, M, F>) -> Result<Envelope, PipelineError>
    where
        M: Model,
        F: Form<M>,
    {
        let id = req.resource_id();
        let UpdateRequest {
            context,
            model,
            security,
            before_save,
            after_save,
            ..
        } = req;

        gate(&security, context).await?;

        self.fetch(model, &id).await?;

        let form = bind_form::<M, F>(context)?;
        project(&form, model)?;
        debug!(stage = "project", "form bound onto model");

        self.save_with_hooks(model, &before_save, &after_save, "edit")
            .await?;

        Ok(Envelope::success(
            StatusCode::OK,
            format!("successfully edited {}", self.name),
            Some(self.single(model)?),
            MetaData::default(),
        ))
    }

    async fn view_stages<M: Model>(&self, req: ViewRequest<'_, M>) -> Result<Envelope, PipelineError> {
        let id = req.resource_id();
        let ViewRequest {
            context,
            model,
            security,
            after_find,
            ..
        } = req;

        gate(&security, context).await?;

        self.fetch(model, &id).await?;
        run_hook(&after_find, HookPoint::AfterFind, model).await?;

        Ok(Envelope::success(
            StatusCode::OK,
            format!("successfully loaded {}", self.name),
            Some(self.single(model)?),
            MetaData::default(),
        ))
    }

    async fn list_stages<M, L>(&self, req: ListRequest<'_, M, L>) -> Result<Envelope, PipelineError>
    where
        M: Model,
        L: Filter + DeserializeOwned,
    {
        let ListRequest {
            context,
            model,
            security,
            before_list,
            after_list,
            ..
        } = req;

        gate(&security, context).await?;

        let filter: L = context
            .bind_query()
            .map_err(|cause| PipelineError::FilterBindFailed {
                resource: self.name.clone(),
                cause,
            })?;
        let pagination = Pagination::from_query(context.query_map());
        debug!(
            stage = "bind filter",
            limit = pagination.limit,
            page = pagination.page,
            "filter bound"
        );

        run_hook(&before_list, HookPoint::BeforeList, model).await?;

        let listing = model
            .list(&filter, &pagination)
            .await
            .map_err(|cause| PipelineError::NotFound {
                resource: self.name.clone(),
                cause,
            })?;
        debug!(stage = "query", total_counts = listing.total_counts, "list queried");

        run_hook(&after_list, HookPoint::AfterList, model).await?;

        let items = serde_json::to_value(&listing.items).map_err(|e| PipelineError::EncodeFailed {
            resource: self.name.clone(),
            cause: e.into(),
        })?;

        let mut data = Map::new();
        data.insert(self.list_key(), items);
        data.insert("total_counts".to_string(), Value::from(listing.total_counts));
        data.insert("total_pages".to_string(), Value::from(listing.total_pages));

        Ok(Envelope::success(
            StatusCode::OK,
            format!("successfully loaded {} list", self.name),
            Some(data),
            MetaData::for_page(&pagination, listing.total_counts, listing.total_pages),
        ))
    }

    async fn delete_stages<M: Model>(&self, req: DeleteRequest<'_, M>) -> Result<Envelope, PipelineError> {
        let id = req.resource_id();
        let DeleteRequest {
            context,
            model,
            security,
            before_remove,
            after_remove,
            ..
        } = req;

        gate(&security, context).await?;

        run_hook(&before_remove, HookPoint::BeforeRemove, model).await?;

        model
            .remove(&id)
            .await
            .map_err(|cause| PipelineError::NotFound {
                resource: self.name.clone(),
                cause,
            })?;
        debug!(stage = "remove", id = %id, "resource removed");

        run_hook(&after_remove, HookPoint::AfterRemove, model).await?;

        Ok(Envelope::success(
            StatusCode::OK,
            "successfully removed",
            None,
            MetaData::default(),
        ))
    }

    async fn fetch<M: Model>(&self, model: &mut M, id: &str) -> Result<(), PipelineError> {
        model
            .get_one(id)
            .await
            .map_err(|cause| PipelineError::NotFound {
                resource: self.name.clone(),
                cause,
            })?;
        debug!(stage = "fetch", id = %id, "resource loaded");
        Ok(())
    }

    async fn save_with_hooks<M: Model>(
        &self,
        model: &mut M,
        before_save: &Hook<M>,
        after_save: &Hook<M>,
        action: &'static str,
    ) -> Result<(), PipelineError> {
        run_hook(before_save, HookPoint::BeforeSave, model).await?;

        model.save().await.map_err(|cause| PipelineError::SaveFailed {
            action,
            resource: self.name.clone(),
            cause,
        })?;
        debug!(stage = "save", "resource persisted");

        run_hook(after_save, HookPoint::AfterSave, model).await
    }

    /// Data map of a single-item response: `{ <name>: <model> }`
    fn single<M: Model>(&self, model: &M) -> Result<Map<String, Value>, PipelineError> {
        let value = serde_json::to_value(model).map_err(|e| PipelineError::EncodeFailed {
            resource: self.name.clone(),
            cause: e.into(),
        })?;

        let mut data = Map::new();
        data.insert(self.name.clone(), value);
        Ok(data)
    }
}

async fn gate(security: &Security, context: &RequestContext) -> Result<(), PipelineError> {
    security.authenticate(context).await?;
    debug!(stage = "authenticate", "caller authenticated");
    security.authorize(context).await?;
    debug!(stage = "authorize", "caller authorized");
    Ok(())
}

async fn run_hook<M: Model>(hook: &Hook<M>, point: HookPoint, model: &mut M) -> Result<(), PipelineError> {
    if !hook.is_set() {
        return Ok(());
    }

    hook.run(model)
        .await
        .map_err(|cause| PipelineError::hook(point, cause))?;
    debug!(stage = %point, "hook ran");
    Ok(())
}
