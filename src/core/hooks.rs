//! Lifecycle hooks
//!
//! A hook is an optional callback invoked at one point of an operation with
//! the current model and a fixed list of key/value parameters. Parameters
//! carry request data the pipeline itself knows nothing about (a derived
//! classification, the acting user, ...).
//!
//! Any `Fn(&mut M, &[HookParam]) -> anyhow::Result<()>` is a hook function.
//! Hooks that need to await (to persist follow-up state, for instance)
//! implement [`HookFn`] directly.
//!
//! ```rust,ignore
//! let before_save = Hook::from_fn(|product: &mut Product, params: &[HookParam]| {
//!     if let Some(kind) = HookParam::find_str(params, "type") {
//!         product.kind = kind.to_string();
//!     }
//!     Ok(())
//! })
//! .with_param("type", "furniture");
//! ```

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Named point of the lifecycle where a hook may run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookPoint {
    BeforeSave,
    AfterSave,
    BeforeList,
    AfterList,
    BeforeRemove,
    AfterRemove,
    AfterFind,
}

impl HookPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPoint::BeforeSave => "beforesave",
            HookPoint::AfterSave => "aftersave",
            HookPoint::BeforeList => "beforelist",
            HookPoint::AfterList => "afterlist",
            HookPoint::BeforeRemove => "beforeremove",
            HookPoint::AfterRemove => "afterremove",
            HookPoint::AfterFind => "afterfind",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key/value parameter handed to a hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookParam {
    pub key: String,
    pub value: Value,
}

impl HookParam {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Find the first parameter with `key`
    pub fn find<'a>(params: &'a [HookParam], key: &str) -> Option<&'a Value> {
        params.iter().find(|p| p.key == key).map(|p| &p.value)
    }

    /// Find the first parameter with `key` holding a string
    pub fn find_str<'a>(params: &'a [HookParam], key: &str) -> Option<&'a str> {
        Self::find(params, key).and_then(Value::as_str)
    }
}

/// Callback invoked at a lifecycle point
#[async_trait]
pub trait HookFn<M>: Send + Sync {
    async fn call(&self, model: &mut M, params: &[HookParam]) -> Result<()>;
}

#[async_trait]
impl<M, F> HookFn<M> for F
where
    M: Send,
    F: Fn(&mut M, &[HookParam]) -> Result<()> + Send + Sync,
{
    async fn call(&self, model: &mut M, params: &[HookParam]) -> Result<()> {
        self(model, params)
    }
}

/// Optional hook function with its parameters
///
/// An empty hook (the default) is a no-op.
pub struct Hook<M> {
    function: Option<Arc<dyn HookFn<M>>>,
    params: Vec<HookParam>,
}

impl<M: Send + 'static> Hook<M> {
    /// Hook running `function`
    pub fn new(function: impl HookFn<M> + 'static) -> Self {
        Self {
            function: Some(Arc::new(function)),
            params: Vec::new(),
        }
    }

    /// Hook running a plain closure
    pub fn from_fn<F>(function: F) -> Self
    where
        F: Fn(&mut M, &[HookParam]) -> Result<()> + Send + Sync + 'static,
    {
        Self::new(function)
    }

    /// Hook that does nothing
    pub fn none() -> Self {
        Self {
            function: None,
            params: Vec::new(),
        }
    }

    /// Append a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push(HookParam::new(key, value));
        self
    }

    /// Replace all parameters
    pub fn with_params(mut self, params: Vec<HookParam>) -> Self {
        self.params = params;
        self
    }

    pub fn is_set(&self) -> bool {
        self.function.is_some()
    }

    pub fn params(&self) -> &[HookParam] {
        &self.params
    }

    /// Run the hook against `model`; absent hooks succeed immediately
    pub async fn run(&self, model: &mut M) -> Result<()> {
        match &self.function {
            Some(function) => function.call(model, &self.params).await,
            None => Ok(()),
        }
    }
}

impl<M> Clone for Hook<M> {
    fn clone(&self) -> Self {
        Self {
            function: self.function.clone(),
            params: self.params.clone(),
        }
    }
}

impl<M> Default for Hook<M> {
    fn default() -> Self {
        Self {
            function: None,
            params: Vec::new(),
        }
    }
}

impl<M> fmt::Debug for Hook<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("set", &self.function.is_some())
            .field("params", &self.params)
            .finish()
    }
}
