use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use xbind::prelude::*;
use xbind::test_utils::{Method, MockTransport};

struct Harness {
    client: InMemoryQueryClient,
    transport: MockTransport,
    ctx: BindContext,
    x: Registry<VirtualDom>,
}

impl Harness {
    fn new() -> Self {
        let client = InMemoryQueryClient::new();
        let transport = MockTransport::new();
        let ctx = BindContext::new(Arc::new(client.clone()), Arc::new(transport.clone()));
        Self {
            client,
            transport,
            ctx,
            x: Registry::new(VirtualDom),
        }
    }

    fn scope(&self) -> Scope {
        self.ctx.scope()
    }

    fn render(&self, scope: &Scope, tag: Tag, props: Props) -> Node {
        self.x.tag(tag).render(scope, props)
    }

    fn is_stale(&self, key: &QueryKey) -> bool {
        self.client
            .query_state(key)
            .is_some_and(|state| state.is_stale())
    }
}

fn reader(url: &str, key: QueryKey) -> Props {
    Props::new()
        .binding(Binding::new().get(url).id(key))
        .child("loading")
}

fn counter() -> (Arc<AtomicUsize>, EventHandler) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let on_event = handler(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (count, on_event)
}

#[tokio::test]
async fn test_get_content_replaces_children_once_loaded() {
    let h = Harness::new();
    h.transport.respond_get("/data", "42");
    let scope = h.scope();

    let first = h.render(&scope, Tag::Div, reader("/data", key!["a"]));
    assert_eq!(first.text_content(), "loading");

    h.client.wait_idle().await;
    for _ in 0..3 {
        let node = h.render(&scope, Tag::Div, reader("/data", key!["a"]));
        let element = node.as_element().unwrap();
        assert_eq!(element.inner_html(), Some("42"));
        assert!(element.children().is_empty());
    }
    assert_eq!(h.transport.count(), 1);
}

#[tokio::test]
async fn test_empty_payload_keeps_children() {
    let h = Harness::new();
    h.transport.respond_get("/empty", "");
    let scope = h.scope();

    h.render(&scope, Tag::Div, reader("/empty", key!["e"]));
    h.client.wait_idle().await;

    let node = h.render(&scope, Tag::Div, reader("/empty", key!["e"]));
    assert_eq!(node.as_element().unwrap().inner_html(), None);
    assert_eq!(node.text_content(), "loading");
}

#[tokio::test]
async fn test_no_get_url_never_injects() {
    let h = Harness::new();
    h.client.set_query_data(&key!["seeded"], "<i>cached</i>");
    let scope = h.scope();

    let node = h.render(
        &scope,
        Tag::Div,
        Props::new()
            .binding(Binding::new().id(key!["seeded"]))
            .child("own"),
    );
    assert_eq!(node.text_content(), "own");
    assert_eq!(h.transport.count(), 0);
}

#[tokio::test]
async fn test_failed_fetch_keeps_children_and_records_error() {
    let h = Harness::new();
    h.transport.fail_get("/broken", 502);
    let scope = h.scope();

    h.render(&scope, Tag::Div, reader("/broken", key!["b"]));
    h.client.wait_idle().await;

    let node = h.render(&scope, Tag::Div, reader("/broken", key!["b"]));
    assert_eq!(node.text_content(), "loading");
    let state = h.client.query_state(&key!["b"]).unwrap();
    assert!(state.error.is_some());
    assert_eq!(h.transport.count(), 1);
}

#[tokio::test]
async fn test_elements_sharing_a_key_share_busy_state() {
    let h = Harness::new();
    h.transport.respond_get("/k", "k");
    h.transport.hold();

    let button = |scope: &Scope| {
        h.render(
            scope,
            Tag::Button,
            Props::new().binding(
                Binding::new().disabled_when(DisabledPolicy::Key(key!["k"])),
            ),
        )
    };
    let (a, b) = (h.scope(), h.scope());

    h.render(&h.scope(), Tag::Div, reader("/k", key!["k"]));
    assert!(button(&a).as_element().unwrap().is_disabled());
    assert!(button(&b).as_element().unwrap().is_disabled());

    h.transport.release();
    h.client.wait_idle().await;
    assert!(!button(&a).as_element().unwrap().is_disabled());
    assert!(!button(&b).as_element().unwrap().is_disabled());
}

#[tokio::test]
async fn test_indicator_visible_only_while_busy() {
    let h = Harness::new();
    h.transport.respond_get("/x", "x");
    let indicator_scope = h.scope();
    let indicator = || {
        h.render(
            &indicator_scope,
            Tag::Span,
            Props::new()
                .attr("x-indicate", r#"["x"]"#)
                .child("Loading..."),
        )
    };

    assert!(indicator().is_empty());

    h.transport.hold();
    h.render(&h.scope(), Tag::Div, reader("/x", key!["x"]));
    assert_eq!(indicator().text_content(), "Loading...");

    h.transport.release();
    h.client.wait_idle().await;
    assert!(indicator().is_empty());
}

#[tokio::test]
async fn test_indicator_counts_only_exact_mutation_channel() {
    let h = Harness::new();
    h.transport.respond_post("/save", "ok");
    h.transport.hold();

    let scope = h.scope();
    let button = h.render(
        &scope,
        Tag::Button,
        Props::new().binding(Binding::new().post("/save").id(key!["k", "sub"])),
    );
    button.click();

    let on_parent = h.render(
        &h.scope(),
        Tag::Span,
        Props::new().binding(Binding::new().indicate_on(key!["k"])).child("*"),
    );
    let on_channel = h.render(
        &h.scope(),
        Tag::Span,
        Props::new()
            .binding(Binding::new().indicate_on(key!["k", "sub"]))
            .child("*"),
    );
    assert!(on_parent.is_empty());
    assert_eq!(on_channel.text_content(), "*");

    h.transport.release();
    h.client.wait_idle().await;
}

#[tokio::test]
async fn test_loading_policy_tracks_own_mutation() {
    let h = Harness::new();
    h.transport.respond_post("/save", "saved");
    let scope = h.scope();
    let button = || {
        h.render(
            &scope,
            Tag::Button,
            Props::new()
                .attr("x-post", "/save")
                .attr("x-disabled", "loading")
                .child("Save"),
        )
    };

    assert!(!button().as_element().unwrap().is_disabled());

    h.transport.hold();
    button().click();
    assert!(button().as_element().unwrap().is_disabled());
    // another instance stays enabled
    let other = h.render(
        &h.scope(),
        Tag::Button,
        Props::new().attr("x-post", "/save").attr("x-disabled", "load"),
    );
    assert!(!other.as_element().unwrap().is_disabled());

    h.transport.release();
    h.client.wait_idle().await;
    assert!(!button().as_element().unwrap().is_disabled());
    assert_eq!(
        h.client.mutation_state(scope.instance()).unwrap().data.as_deref(),
        Some("saved")
    );
}

#[tokio::test]
async fn test_loading_policy_reenables_after_failure() {
    let h = Harness::new();
    h.transport.fail_post("/save", 500);
    let scope = h.scope();
    let button = || {
        h.render(
            &scope,
            Tag::Button,
            Props::new()
                .binding(
                    Binding::new()
                        .post("/save")
                        .disabled_when(DisabledPolicy::Loading)
                        .invalidates(key!["x"]),
                ),
        )
    };
    h.client.set_query_data(&key!["x"], "old");

    h.transport.hold();
    button().click();
    assert!(button().as_element().unwrap().is_disabled());

    h.transport.release();
    h.client.wait_idle().await;
    assert!(!button().as_element().unwrap().is_disabled());
    assert!(h.client.mutation_state(scope.instance()).unwrap().error.is_some());
    assert!(!h.is_stale(&key!["x"]));
}

#[tokio::test]
async fn test_button_post_then_invalidate() {
    let h = Harness::new();
    h.transport.respond_get("/x", "v1");
    h.transport.respond_post("/touch", "done");
    let reader_scope = h.scope();

    h.render(&reader_scope, Tag::Div, reader("/x", key!["x", 1]));
    h.client.wait_idle().await;
    assert!(!h.is_stale(&key!["x", 1]));

    let (clicks, on_click) = counter();
    let button = h.render(
        &h.scope(),
        Tag::Button,
        Props::new()
            .attr("x-post", "/touch")
            .attr("x-invalidate", r#"["x"]"#)
            .on_click(on_click),
    );

    h.transport.hold();
    button.click();
    assert_eq!(clicks.load(Ordering::SeqCst), 1);
    assert!(!h.is_stale(&key!["x", 1]));

    h.transport.release();
    h.client.wait_idle().await;
    assert!(h.is_stale(&key!["x", 1]));
    let post = h.transport.calls().into_iter().find(|c| c.method == Method::Post);
    assert!(post.unwrap().fields.is_empty());

    h.transport.respond_get("/x", "v2");
    h.render(&reader_scope, Tag::Div, reader("/x", key!["x", 1]));
    h.client.wait_idle().await;
    let node = h.render(&reader_scope, Tag::Div, reader("/x", key!["x", 1]));
    assert_eq!(node.text_content(), "v2");
    assert_eq!(h.transport.count_for(Method::Get, "/x"), 2);
}

#[tokio::test]
async fn test_literal_invalidation_without_post_is_immediate() {
    let h = Harness::new();
    h.client.set_query_data(&key!["list"], "rows");

    let node = h.render(
        &h.scope(),
        Tag::A,
        Props::new()
            .attr("href", "#")
            .binding(Binding::new().invalidates(key!["list"])),
    );
    node.click();

    assert!(h.is_stale(&key!["list"]));
    assert_eq!(h.transport.count(), 0);
}

#[tokio::test]
async fn test_function_invalidation_uses_mutation_result() {
    let h = Harness::new();
    h.transport.respond_post("/create", "7");
    h.client.set_query_data(&key!["item", "7"], "a");
    h.client.set_query_data(&key!["item", "8"], "b");

    let node = h.render(
        &h.scope(),
        Tag::Button,
        Props::new().binding(
            Binding::new()
                .post("/create")
                .invalidates_with(|result| key!["item", result]),
        ),
    );
    node.click();
    h.client.wait_idle().await;

    assert!(h.is_stale(&key!["item", "7"]));
    assert!(!h.is_stale(&key!["item", "8"]));
}

#[tokio::test]
async fn test_function_invalidation_without_post_is_skipped() {
    let h = Harness::new();
    h.client.set_query_data(&key!["item"], "a");
    let node = h.render(
        &h.scope(),
        Tag::Div,
        Props::new().binding(Binding::new().invalidates_with(|_| key!["item"])),
    );
    node.click();
    assert!(!h.is_stale(&key!["item"]));
}

#[tokio::test]
async fn test_form_submit_posts_fields_then_invalidates() {
    let h = Harness::new();
    h.transport.respond_post("/submit", "ok");
    h.client.set_query_data(&key!["list"], "rows");

    let order = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&order);
    let client = h.client.clone();
    let on_submit = handler(move |event| {
        seen.lock()
            .unwrap()
            .push((event.default_prevented(), client.is_idle()));
    });
    let (clicks, on_click) = counter();

    let form = h.render(
        &h.scope(),
        Tag::Form,
        Props::new()
            .attr("x-post", "/submit")
            .attr("x-invalidate", r#"["list"]"#)
            .on_submit(on_submit)
            .on_click(on_click),
    );

    assert!(form.click().is_some());
    assert_eq!(clicks.load(Ordering::SeqCst), 0);
    assert_eq!(h.transport.count(), 0);

    h.transport.hold();
    let fields = FormData::new().with("title", "hello").with("tag", "a");
    let event = form.submit(fields.clone()).unwrap();
    assert!(event.default_prevented());
    assert!(!h.is_stale(&key!["list"]));

    h.transport.release();
    h.client.wait_idle().await;
    assert!(h.is_stale(&key!["list"]));

    let calls = h.transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].url, "/submit");
    assert_eq!(calls[0].fields, fields.fields().to_vec());
    // user handler runs once the mutation is already in flight
    assert_eq!(*order.lock().unwrap(), vec![(true, false)]);
}

#[tokio::test]
async fn test_form_submit_failure_does_not_invalidate() {
    let h = Harness::new();
    h.transport.fail_post("/submit", 422);
    h.client.set_query_data(&key!["list"], "rows");

    let form = h.render(
        &h.scope(),
        Tag::Form,
        Props::new().binding(Binding::new().post("/submit").invalidates(key!["list"])),
    );
    form.submit(FormData::new().with("title", "x"));
    h.client.wait_idle().await;

    assert!(!h.is_stale(&key!["list"]));
}

#[tokio::test]
async fn test_submit_without_post_keeps_default() {
    let h = Harness::new();
    let (submits, on_submit) = counter();
    let form = h.render(&h.scope(), Tag::Form, Props::new().on_submit(on_submit));

    let event = form.submit(FormData::new().with("q", "rust")).unwrap();
    assert!(!event.default_prevented());
    assert_eq!(submits.load(Ordering::SeqCst), 1);
    assert_eq!(h.transport.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_poll_interval_refetches() {
    let h = Harness::new();
    h.transport.respond_get("/tick", "t");
    let props = || {
        Props::new()
            .attr("x-get", "/tick")
            .attr("x-id", r#"["tick"]"#)
            .attr("x-interval", 1000)
    };

    h.render(&h.scope(), Tag::Div, props());
    h.client.wait_idle().await;
    assert_eq!(h.transport.count(), 1);

    tokio::time::sleep(Duration::from_millis(3500)).await;
    h.client.wait_idle().await;
    assert_eq!(h.transport.count(), 4);

    h.client.clear();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.transport.count(), 4);
}

#[tokio::test]
async fn test_ref_and_native_attributes_forwarded() {
    let h = Harness::new();
    let slot = NodeRef::new();
    let node = h.render(
        &h.scope(),
        Tag::Input,
        Props::new()
            .attr("name", "title")
            .attr("x-state", "draft")
            .attr("x-confirm", "Sure?")
            .node_ref(slot.clone()),
    );
    let element = node.as_element().unwrap();
    assert!(element.props.node_ref.as_ref().unwrap().same(&slot));
    assert_eq!(node.to_html(), "<input name=\"title\">");
}

#[tokio::test]
async fn test_html_string_factory_renders_injected_markup() {
    let h = Harness::new();
    h.transport.respond_get("/data", "<b>42</b>");
    let registry = Registry::new(HtmlString);
    let scope = h.scope();
    let props = || {
        Props::new()
            .attr("class", "card")
            .attr("x-get", "/data")
            .attr("x-id", r#"["a"]"#)
            .child("loading & waiting")
    };

    let html = registry.tag(Tag::Div).render(&scope, props());
    assert_eq!(html, "<div class=\"card\">loading &amp; waiting</div>");

    h.client.wait_idle().await;
    let html = registry.tag(Tag::Div).render(&scope, props());
    assert_eq!(html, "<div class=\"card\"><b>42</b></div>");
}
