//! Form binding and projection
//!
//! Binding turns the request body into a typed [`Form`] and validates it.
//! Projection copies the form onto the model: every form field whose name
//! matches a model field overwrites it, then [`Form::bind`] gets the last
//! word.

use anyhow::{Context, anyhow};
use serde_json::Value;

use super::context::RequestContext;
use super::error::PipelineError;
use super::model::{Form, Model};

/// Decode and validate the request payload as `F`
pub fn bind_form<M, F>(ctx: &RequestContext) -> Result<F, PipelineError>
where
    M: Model,
    F: Form<M>,
{
    let form: F = ctx
        .bind_json()
        .map_err(|cause| PipelineError::BindFailed { cause })?;

    validate_form::<M, F>(&form)?;
    Ok(form)
}

/// Run the declared constraints, then the form's own refinement
pub fn validate_form<M, F>(form: &F) -> Result<(), PipelineError>
where
    M: Model,
    F: Form<M>,
{
    form.validate()
        .map_err(|errors| PipelineError::ValidationFailed {
            cause: anyhow!(errors),
        })?;

    form.refine()
        .map_err(|cause| PipelineError::ValidationFailed { cause })
}

/// Project `form` onto `model`
///
/// Model fields with no counterpart in the form are left untouched. Form
/// fields unknown to the model are ignored.
pub fn project<M, F>(form: &F, model: &mut M) -> Result<(), PipelineError>
where
    M: Model,
    F: Form<M>,
{
    overlay(form, model).map_err(|cause| PipelineError::ProjectionFailed { cause })?;
    form.bind(model)
        .map_err(|cause| PipelineError::ProjectionFailed { cause })
}

fn overlay<M, F>(form: &F, model: &mut M) -> anyhow::Result<()>
where
    M: Model,
    F: Form<M>,
{
    let mut target = serde_json::to_value(&*model).context("cannot encode model")?;
    let source = serde_json::to_value(form).context("cannot encode form")?;

    let (Value::Object(target_fields), Value::Object(source_fields)) = (&mut target, source) else {
        return Err(anyhow!("form and model must both encode as JSON objects"));
    };

    for (name, value) in source_fields {
        if let Some(slot) = target_fields.get_mut(&name) {
            *slot = value;
        }
    }

    let projected: M = serde_json::from_value(target).context("form fields do not fit the model")?;
    model.absorb(projected);
    Ok(())
}
