//! Behavioral tests for the resource pipeline
//!
//! These tests verify that:
//! - Stages run in the documented order for every operation kind
//! - The first failing stage stops everything after it
//! - Status codes follow the stage that failed
//! - Pagination reaches the model exactly as reported in the metadata

use anyhow::{Result, anyhow, bail};
use api_maker::core::pagination::{MAX_LIMIT, UNLIMITED};
use api_maker::prelude::*;
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex};

// =============================================================================
// Recording model
// =============================================================================

/// Shared record of what the pipeline asked the model to do
#[derive(Debug, Clone, Default)]
struct Probe {
    calls: Arc<Mutex<Vec<String>>>,
    seen_pagination: Arc<Mutex<Option<Pagination>>>,
    seen_filters: Arc<Mutex<Option<Map<String, Value>>>>,
    fail_save: bool,
    fail_get: bool,
}

impl Probe {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Widget {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    label: String,
    #[serde(skip)]
    probe: Probe,
}

impl Widget {
    fn with_probe(probe: &Probe) -> Self {
        Self {
            probe: probe.clone(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Model for Widget {
    async fn save(&mut self) -> Result<()> {
        self.probe.record("save");
        if self.probe.fail_save {
            bail!("disk full");
        }
        if self.id.is_empty() {
            self.id = "w-1".into();
        }
        Ok(())
    }

    async fn get_one(&mut self, id: &str) -> Result<()> {
        self.probe.record(format!("get_one:{}", id));
        if self.probe.fail_get || id != "w-1" {
            bail!("widget {} does not exist", id);
        }
        self.id = id.into();
        self.name = "stored".into();
        self.size = 1;
        Ok(())
    }

    async fn list(&self, filter: &dyn Filter, pagination: &Pagination) -> Result<Listing<Self>> {
        self.probe.record("list");
        *self.probe.seen_pagination.lock().unwrap() = Some(pagination.clone());
        *self.probe.seen_filters.lock().unwrap() = Some(filter.filters());

        let items = vec![Widget {
            id: "w-1".into(),
            name: "stored".into(),
            ..Widget::default()
        }];
        Ok(Listing::new(23, pagination.total_pages(23), items))
    }

    async fn remove(&mut self, id: &str) -> Result<()> {
        self.probe.record(format!("remove:{}", id));
        Ok(())
    }

    fn absorb(&mut self, projected: Self) {
        let probe = self.probe.clone();
        *self = projected;
        self.probe = probe;
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
struct WidgetForm {
    #[validate(length(min = 1))]
    name: String,
    #[validate(range(min = 0))]
    size: i64,
}

impl Form<Widget> for WidgetForm {
    fn bind(&self, widget: &mut Widget) -> Result<()> {
        widget.label = format!("{}-{}", self.name, self.size);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WidgetFilter {
    name: Option<String>,
}

impl Filter for WidgetFilter {
    fn filters(&self) -> Map<String, Value> {
        let mut filters = Map::new();
        if let Some(name) = &self.name {
            filters.insert("name".into(), json!(name));
        }
        filters
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn service() -> ApiService {
    ApiService::new("widget")
}

fn recording(point: &'static str) -> Hook<Widget> {
    Hook::from_fn(move |w: &mut Widget, _: &[HookParam]| {
        w.probe.record(format!("hook:{}", point));
        Ok(())
    })
}

fn failing(point: &'static str) -> Hook<Widget> {
    Hook::from_fn(move |w: &mut Widget, _: &[HookParam]| {
        w.probe.record(format!("hook:{}", point));
        Err(anyhow!("{} refused", point))
    })
}

fn deny() -> Security {
    Security::none().with_authenticator(|_: &RequestContext| -> Result<bool> { Ok(false) })
}

fn write_context() -> RequestContext {
    RequestContext::new()
        .with_param("id", "w-1")
        .with_json(&json!({"name": "gear", "size": 3}))
}

async fn run(operation: Operation, ctx: &RequestContext, widget: &mut Widget, security: Security) -> Envelope {
    let service = service();
    match operation {
        Operation::Create => {
            service
                .create(
                    CreateRequest::<Widget, WidgetForm>::new(ctx, widget)
                        .with_security(security)
                        .before_save(recording("beforesave"))
                        .after_save(recording("aftersave")),
                )
                .await
        }
        Operation::Update => {
            service
                .update(
                    UpdateRequest::<Widget, WidgetForm>::new(ctx, widget)
                        .with_security(security)
                        .before_save(recording("beforesave"))
                        .after_save(recording("aftersave")),
                )
                .await
        }
        Operation::View => {
            service
                .view(
                    ViewRequest::new(ctx, widget)
                        .with_security(security)
                        .after_find(recording("afterfind")),
                )
                .await
        }
        Operation::List => {
            service
                .list(
                    ListRequest::<Widget, WidgetFilter>::new(ctx, widget)
                        .with_security(security)
                        .before_list(recording("beforelist"))
                        .after_list(recording("afterlist")),
                )
                .await
        }
        Operation::Delete => {
            service
                .delete(
                    DeleteRequest::new(ctx, widget)
                        .with_security(security)
                        .before_remove(recording("beforeremove"))
                        .after_remove(recording("afterremove")),
                )
                .await
        }
    }
}

// =============================================================================
// Pagination
// =============================================================================

mod pagination_tests {
    use super::*;

    #[test]
    fn test_normalized_bounds_and_idempotence() {
        let limits = [-5, 0, 1, 7, 100, 101, 10_000];
        let pages = [-3, 0, 1, 2, 50];

        for &limit in &limits {
            for &page in &pages {
                for unlimited in [false, true] {
                    let p = Pagination::new(limit, page, "name", unlimited);

                    if unlimited {
                        assert_eq!(p.limit, UNLIMITED);
                    } else {
                        assert!((1..=MAX_LIMIT).contains(&p.limit), "limit {}", p.limit);
                    }
                    assert!(p.page >= 1);
                    assert_eq!(p.sort, "name");
                    assert_eq!(p.clone().normalized(), p);
                }
            }
        }
    }

    #[test]
    fn test_out_of_range_limit_becomes_default() {
        assert_eq!(Pagination::new(0, 1, "", false).limit, 10);
        assert_eq!(Pagination::new(101, 1, "", false).limit, 10);
        assert_eq!(Pagination::new(100, 1, "", false).limit, 100);
    }
}

// =============================================================================
// Short-circuit policy
// =============================================================================

mod short_circuit_tests {
    use super::*;

    #[tokio::test]
    async fn test_denied_authentication_stops_every_kind() {
        for operation in Operation::ALL {
            let probe = Probe::default();
            let mut widget = Widget::with_probe(&probe);
            let ctx = write_context();

            let envelope = run(operation, &ctx, &mut widget, deny()).await;

            assert_eq!(envelope.code, 401, "{}", operation);
            assert!(envelope.data.is_none());
            assert!(envelope.success_message.is_empty());
            assert!(probe.calls().is_empty(), "{}: {:?}", operation, probe.calls());
        }
    }

    #[tokio::test]
    async fn test_failing_authenticator_fails_closed() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = write_context();
        let security = Security::none()
            .with_authenticator(|_: &RequestContext| -> Result<bool> { Err(anyhow!("idp unreachable")) });

        let envelope = run(Operation::View, &ctx, &mut widget, security).await;
        assert_eq!(envelope.code, 401);
        assert_eq!(envelope.error_message, "idp unreachable");
        assert!(probe.calls().is_empty());
    }

    #[tokio::test]
    async fn test_denied_authorization_is_403() {
        for operation in Operation::ALL {
            let probe = Probe::default();
            let mut widget = Widget::with_probe(&probe);
            let ctx = write_context();
            let security = Security::none()
                .with_authorizer(|_: &RequestContext| -> Result<bool> { Ok(false) });

            let envelope = run(operation, &ctx, &mut widget, security).await;
            assert_eq!(envelope.code, 403, "{}", operation);
            assert!(probe.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn test_before_save_error_prevents_save() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = write_context();

        let envelope = service()
            .create(
                CreateRequest::<Widget, WidgetForm>::new(&ctx, &mut widget)
                    .before_save(failing("beforesave"))
                    .after_save(recording("aftersave")),
            )
            .await;

        assert_eq!(envelope.code, 400);
        assert_eq!(
            envelope.error_message,
            "cannot use function beforesave: beforesave refused"
        );
        assert_eq!(probe.calls(), ["hook:beforesave"]);
    }

    #[tokio::test]
    async fn test_before_save_error_on_update_prevents_save() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = write_context();

        let envelope = service()
            .update(
                UpdateRequest::<Widget, WidgetForm>::new(&ctx, &mut widget)
                    .before_save(failing("beforesave")),
            )
            .await;

        assert_eq!(envelope.code, 400);
        assert_eq!(probe.calls(), ["get_one:w-1", "hook:beforesave"]);
    }

    #[tokio::test]
    async fn test_before_list_error_prevents_query() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = RequestContext::new();

        let envelope = service()
            .list(
                ListRequest::<Widget, WidgetFilter>::new(&ctx, &mut widget)
                    .before_list(failing("beforelist"))
                    .after_list(recording("afterlist")),
            )
            .await;

        assert_eq!(envelope.code, 400);
        assert_eq!(probe.calls(), ["hook:beforelist"]);
        assert!(probe.seen_pagination.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_before_remove_error_prevents_remove() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = RequestContext::new().with_param("id", "w-1");

        let envelope = service()
            .delete(
                DeleteRequest::new(&ctx, &mut widget)
                    .before_remove(failing("beforeremove"))
                    .after_remove(recording("afterremove")),
            )
            .await;

        assert_eq!(envelope.code, 400);
        assert_eq!(probe.calls(), ["hook:beforeremove"]);
    }

    #[tokio::test]
    async fn test_malformed_payload_runs_no_hooks() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = RequestContext::new().with_body("{\"name\": ");

        let envelope = run(Operation::Create, &ctx, &mut widget, Security::none()).await;
        assert_eq!(envelope.code, 400);
        assert!(!envelope.error_message.is_empty());
        assert!(probe.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_form_runs_no_hooks() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = RequestContext::new().with_json(&json!({"name": "", "size": -1}));

        let envelope = run(Operation::Create, &ctx, &mut widget, Security::none()).await;
        assert_eq!(envelope.code, 400);
        assert!(probe.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_id_skips_hooks_and_save() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = RequestContext::new()
            .with_param("id", "missing")
            .with_json(&json!({"name": "gear", "size": 3}));

        let envelope = run(Operation::Update, &ctx, &mut widget, Security::none()).await;

        assert_eq!(envelope.code, 400);
        assert_eq!(envelope.error_message, "widget missing does not exist");
        assert_eq!(probe.calls(), ["get_one:missing"]);
    }

    #[tokio::test]
    async fn test_save_failure_is_500_and_skips_after_save() {
        let probe = Probe {
            fail_save: true,
            ..Probe::default()
        };
        let mut widget = Widget::with_probe(&probe);
        let ctx = write_context();

        let envelope = run(Operation::Create, &ctx, &mut widget, Security::none()).await;
        assert_eq!(envelope.code, 500);
        assert_eq!(envelope.error_message, "disk full");
        assert_eq!(probe.calls(), ["hook:beforesave", "save"]);
    }

    #[tokio::test]
    async fn test_after_save_error_reports_hook_after_persisting() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = write_context();

        let envelope = service()
            .create(
                CreateRequest::<Widget, WidgetForm>::new(&ctx, &mut widget)
                    .after_save(failing("aftersave")),
            )
            .await;

        assert_eq!(envelope.code, 400);
        assert!(envelope.error_message.contains("cannot use function aftersave"));
        assert_eq!(probe.calls(), ["save", "hook:aftersave"]);
    }
}

// =============================================================================
// Successful operations
// =============================================================================

mod success_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_returns_saved_model() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = write_context();

        let envelope = run(Operation::Create, &ctx, &mut widget, Security::none()).await;

        assert_eq!(envelope.code, 200);
        assert_eq!(envelope.success_message, "successfully added widget");
        assert!(envelope.error_message.is_empty());

        let data = envelope.data.expect("create returns data");
        assert_eq!(data["widget"], serde_json::to_value(&widget).unwrap());
        assert_eq!(data["widget"]["id"], "w-1");
        assert_eq!(
            probe.calls(),
            ["hook:beforesave", "save", "hook:aftersave"]
        );
    }

    #[tokio::test]
    async fn test_projection_reproduces_form_fields() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = RequestContext::new().with_json(&json!({"name": "cog", "size": 12}));

        run(Operation::Create, &ctx, &mut widget, Security::none()).await;

        assert_eq!(widget.name, "cog");
        assert_eq!(widget.size, 12);
        assert_eq!(widget.label, "cog-12");
    }

    #[tokio::test]
    async fn test_update_overlays_form_on_stored_model() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = write_context();

        let envelope = run(Operation::Update, &ctx, &mut widget, Security::none()).await;

        assert_eq!(envelope.code, 200);
        assert_eq!(envelope.success_message, "successfully edited widget");
        assert_eq!(widget.id, "w-1");
        assert_eq!(widget.name, "gear");
        assert_eq!(
            probe.calls(),
            ["get_one:w-1", "hook:beforesave", "save", "hook:aftersave"]
        );
    }

    #[tokio::test]
    async fn test_view_runs_after_find() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = RequestContext::new().with_param("id", "w-1");

        let envelope = run(Operation::View, &ctx, &mut widget, Security::none()).await;

        assert_eq!(envelope.success_message, "successfully loaded widget");
        assert_eq!(envelope.data.unwrap()["widget"]["name"], "stored");
        assert_eq!(probe.calls(), ["get_one:w-1", "hook:afterfind"]);
    }

    #[tokio::test]
    async fn test_list_unlimited_metadata_matches_query() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = RequestContext::new()
            .with_uri("/widget/list?limit=0&page=0&unlimited=true&name=gear")
            .unwrap();

        let envelope = run(Operation::List, &ctx, &mut widget, Security::none()).await;

        assert_eq!(envelope.code, 200);
        assert_eq!(envelope.success_message, "successfully loaded widget list");

        let seen = probe.seen_pagination.lock().unwrap().clone().unwrap();
        assert_eq!(seen.limit, UNLIMITED);
        assert_eq!(seen.page, 1);
        assert_eq!(envelope.metadata.limit, seen.limit);
        assert_eq!(envelope.metadata.current_page, seen.page);
        assert_eq!(envelope.metadata.sort, seen.sort);
        assert_eq!(envelope.metadata.total_counts, 23);
        assert_eq!(envelope.metadata.total_pages, 1);
        assert_eq!(envelope.metadata.next_page, 0);

        let filters = probe.seen_filters.lock().unwrap().clone().unwrap();
        assert_eq!(filters["name"], "gear");

        let data = envelope.data.unwrap();
        assert_eq!(data["widgets"].as_array().unwrap().len(), 1);
        assert_eq!(data["total_counts"], 23);
        assert_eq!(data["total_pages"], 1);
        assert_eq!(probe.calls(), ["hook:beforelist", "list", "hook:afterlist"]);
    }

    #[tokio::test]
    async fn test_list_reports_next_page() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = RequestContext::new()
            .with_uri("/widget/list?limit=10&page=2&sort=name:desc")
            .unwrap();

        let envelope = run(Operation::List, &ctx, &mut widget, Security::none()).await;

        assert_eq!(envelope.metadata.total_pages, 3);
        assert_eq!(envelope.metadata.current_page, 2);
        assert_eq!(envelope.metadata.next_page, 3);
        assert_eq!(envelope.metadata.sort, "name:desc");
    }

    #[tokio::test]
    async fn test_delete_runs_hooks_around_remove() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = RequestContext::new().with_param("id", "w-1");

        let envelope = run(Operation::Delete, &ctx, &mut widget, Security::none()).await;

        assert_eq!(envelope.code, 200);
        assert_eq!(envelope.success_message, "successfully removed");
        assert!(envelope.data.is_none());
        assert_eq!(
            probe.calls(),
            ["hook:beforeremove", "remove:w-1", "hook:afterremove"]
        );
    }

    #[tokio::test]
    async fn test_explicit_id_wins_over_path() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = RequestContext::new().with_param("id", "ignored");

        let envelope = service()
            .view(ViewRequest::new(&ctx, &mut widget).with_id("w-1"))
            .await;

        assert_eq!(envelope.code, 200);
        assert_eq!(probe.calls(), ["get_one:w-1"]);
    }

    #[tokio::test]
    async fn test_hook_params_reach_the_hook() {
        let probe = Probe::default();
        let mut widget = Widget::with_probe(&probe);
        let ctx = write_context();

        let stamp = Hook::from_fn(|w: &mut Widget, params: &[HookParam]| {
            w.label = HookParam::find_str(params, "type")
                .ok_or_else(|| anyhow!("missing type"))?
                .to_string();
            Ok(())
        })
        .with_param("type", "premium");

        let envelope = service()
            .create(CreateRequest::<Widget, WidgetForm>::new(&ctx, &mut widget).before_save(stamp))
            .await;

        assert_eq!(envelope.data.unwrap()["widget"]["label"], "premium");
    }
}
