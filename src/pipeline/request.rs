//! Per-kind request values handed to the orchestrator
//!
//! Each value borrows the request context and the model for one call and
//! owns the security predicates and hooks configured for it. The form and
//! filter types are carried as type parameters only; the orchestrator
//! decodes them from the request itself.

use std::marker::PhantomData;

use crate::core::context::RequestContext;
use crate::core::hooks::Hook;
use crate::core::model::{Filter, Form, Model};
use crate::core::security::Security;

/// Create: bind a form, save a new model
pub struct CreateRequest<'a, M, F> {
    pub context: &'a RequestContext,
    pub model: &'a mut M,
    pub security: Security,
    pub before_save: Hook<M>,
    pub after_save: Hook<M>,
    form: PhantomData<fn() -> F>,
}

impl<'a, M: Model, F: Form<M>> CreateRequest<'a, M, F> {
    pub fn new(context: &'a RequestContext, model: &'a mut M) -> Self {
        Self {
            context,
            model,
            security: Security::none(),
            before_save: Hook::none(),
            after_save: Hook::none(),
            form: PhantomData,
        }
    }

    pub fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    pub fn before_save(mut self, hook: Hook<M>) -> Self {
        self.before_save = hook;
        self
    }

    pub fn after_save(mut self, hook: Hook<M>) -> Self {
        self.after_save = hook;
        self
    }
}

/// Update: load an existing model, bind a form over it, save it
pub struct UpdateRequest<'a, M, F> {
    pub context: &'a RequestContext,
    pub model: &'a mut M,
    pub id: Option<String>,
    pub security: Security,
    pub before_save: Hook<M>,
    pub after_save: Hook<M>,
    form: PhantomData<fn() -> F>,
}

impl<'a, M: Model, F: Form<M>> UpdateRequest<'a, M, F> {
    pub fn new(context: &'a RequestContext, model: &'a mut M) -> Self {
        Self {
            context,
            model,
            id: None,
            security: Security::none(),
            before_save: Hook::none(),
            after_save: Hook::none(),
            form: PhantomData,
        }
    }

    /// Target a specific id instead of the `id` path parameter
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    pub fn before_save(mut self, hook: Hook<M>) -> Self {
        self.before_save = hook;
        self
    }

    pub fn after_save(mut self, hook: Hook<M>) -> Self {
        self.after_save = hook;
        self
    }

    pub(crate) fn resource_id(&self) -> String {
        resource_id(self.context, self.id.as_deref())
    }
}

/// View: load one model
pub struct ViewRequest<'a, M> {
    pub context: &'a RequestContext,
    pub model: &'a mut M,
    pub id: Option<String>,
    pub security: Security,
    pub after_find: Hook<M>,
}

impl<'a, M: Model> ViewRequest<'a, M> {
    pub fn new(context: &'a RequestContext, model: &'a mut M) -> Self {
        Self {
            context,
            model,
            id: None,
            security: Security::none(),
            after_find: Hook::none(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    pub fn after_find(mut self, hook: Hook<M>) -> Self {
        self.after_find = hook;
        self
    }

    pub(crate) fn resource_id(&self) -> String {
        resource_id(self.context, self.id.as_deref())
    }
}

/// List: query a filtered page of models
pub struct ListRequest<'a, M, L> {
    pub context: &'a RequestContext,
    pub model: &'a mut M,
    pub security: Security,
    pub before_list: Hook<M>,
    pub after_list: Hook<M>,
    filter: PhantomData<fn() -> L>,
}

impl<'a, M: Model, L: Filter> ListRequest<'a, M, L> {
    pub fn new(context: &'a RequestContext, model: &'a mut M) -> Self {
        Self {
            context,
            model,
            security: Security::none(),
            before_list: Hook::none(),
            after_list: Hook::none(),
            filter: PhantomData,
        }
    }

    pub fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    pub fn before_list(mut self, hook: Hook<M>) -> Self {
        self.before_list = hook;
        self
    }

    pub fn after_list(mut self, hook: Hook<M>) -> Self {
        self.after_list = hook;
        self
    }
}

/// Delete: remove one model
pub struct DeleteRequest<'a, M> {
    pub context: &'a RequestContext,
    pub model: &'a mut M,
    pub id: Option<String>,
    pub security: Security,
    pub before_remove: Hook<M>,
    pub after_remove: Hook<M>,
}

impl<'a, M: Model> DeleteRequest<'a, M> {
    pub fn new(context: &'a RequestContext, model: &'a mut M) -> Self {
        Self {
            context,
            model,
            id: None,
            security: Security::none(),
            before_remove: Hook::none(),
            after_remove: Hook::none(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    pub fn before_remove(mut self, hook: Hook<M>) -> Self {
        self.before_remove = hook;
        self
    }

    pub fn after_remove(mut self, hook: Hook<M>) -> Self {
        self.after_remove = hook;
        self
    }

    pub(crate) fn resource_id(&self) -> String {
        resource_id(self.context, self.id.as_deref())
    }
}

/// Kind-neutral write request, dispatched by [`super::ApiService::request`]
pub struct ServiceRequest<'a, M, F> {
    pub context: &'a RequestContext,
    pub model: &'a mut M,
    pub id: Option<String>,
    pub security: Security,
    pub before_save: Hook<M>,
    pub after_save: Hook<M>,
    form: PhantomData<fn() -> F>,
}

impl<'a, M: Model, F: Form<M>> ServiceRequest<'a, M, F> {
    pub fn new(context: &'a RequestContext, model: &'a mut M) -> Self {
        Self {
            context,
            model,
            id: None,
            security: Security::none(),
            before_save: Hook::none(),
            after_save: Hook::none(),
            form: PhantomData,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    pub fn before_save(mut self, hook: Hook<M>) -> Self {
        self.before_save = hook;
        self
    }

    pub fn after_save(mut self, hook: Hook<M>) -> Self {
        self.after_save = hook;
        self
    }
}

impl<'a, M: Model, F: Form<M>> From<ServiceRequest<'a, M, F>> for CreateRequest<'a, M, F> {
    fn from(req: ServiceRequest<'a, M, F>) -> Self {
        Self {
            context: req.context,
            model: req.model,
            security: req.security,
            before_save: req.before_save,
            after_save: req.after_save,
            form: PhantomData,
        }
    }
}

impl<'a, M: Model, F: Form<M>> From<ServiceRequest<'a, M, F>> for UpdateRequest<'a, M, F> {
    fn from(req: ServiceRequest<'a, M, F>) -> Self {
        Self {
            context: req.context,
            model: req.model,
            id: req.id,
            security: req.security,
            before_save: req.before_save,
            after_save: req.after_save,
            form: PhantomData,
        }
    }
}

fn resource_id(context: &RequestContext, explicit: Option<&str>) -> String {
    explicit
        .or_else(|| context.param("id"))
        .unwrap_or_default()
        .to_string()
}
