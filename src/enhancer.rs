//! Bound elements: one render turns a [`Props`] declaration into engine
//! registrations, derived native props and synthesized event handlers.
//!
//! Rendering is stateless. Everything that must survive between renders
//! lives in the query engine, keyed by cache key or by the [`Scope`]'s
//! instance id, so hosts simply render again whenever the engine reports a
//! change.
use futures::future::BoxFuture;
use std::{fmt, sync::Arc};
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};
use xbind_config::AbstractTransport;
use xbind_query::{
    AbstractQueryEngine, FormData, MutationFn, MutationHandle, QueryEngine, QueryError,
    QueryFn, QueryKey, QueryResult,
};

use crate::attrs::{DisabledPolicy, Invalidate, NativeProps, Props, ReservedAttr};
use crate::context::Scope;
use crate::factory::ElementFactory;
use crate::node::{handler, Event, EventHandler};
use crate::tags::ElementKind;

/// Render function of a wrapped component.
pub type RenderFn<O> = Arc<dyn Fn(&Scope, NativeProps) -> O + Send + Sync>;

pub enum Target<O> {
    Element(ElementKind),
    Component { name: String, render: RenderFn<O> },
}

/// A bindable element or component.
pub struct Enhanced<F: ElementFactory> {
    target: Target<F::Output>,
    factory: Arc<F>,
}

impl<F: ElementFactory> Enhanced<F> {
    pub fn element(factory: Arc<F>, kind: ElementKind) -> Self {
        Self {
            target: Target::Element(kind),
            factory,
        }
    }

    pub fn component(
        factory: Arc<F>,
        name: impl Into<String>,
        render: impl Fn(&Scope, NativeProps) -> F::Output + Send + Sync + 'static,
    ) -> Self {
        Self {
            target: Target::Component {
                name: name.into(),
                render: Arc::new(render),
            },
            factory,
        }
    }

    pub fn name(&self) -> &str {
        match &self.target {
            Target::Element(kind) => kind.name(),
            Target::Component { name, .. } => name,
        }
    }

    /// Element kind, `None` for wrapped components.
    pub fn kind(&self) -> Option<&ElementKind> {
        match &self.target {
            Target::Element(kind) => Some(kind),
            Target::Component { .. } => None,
        }
    }

    fn is_form(&self) -> bool {
        self.kind().is_some_and(ElementKind::is_form)
    }

    fn is_button(&self) -> bool {
        self.kind().is_some_and(ElementKind::is_button)
    }

    pub fn render(&self, scope: &Scope, props: Props) -> F::Output {
        let Props {
            attrs,
            binding,
            children,
            on_click,
            on_submit,
            node_ref,
        } = props;
        let ctx = scope.ctx();
        let key = binding.key();

        let query = ctx.engine.register_query(
            &key,
            read_query_fn(&ctx.transport, binding.get_url.as_deref()),
            binding.query_options(),
        );
        let mutation = ctx.engine.register_mutation(
            scope.instance(),
            binding.cache_key.as_ref(),
            mutation_fn(&ctx.transport, binding.post_url.as_deref()),
        );

        let busy = is_busy(ctx.engine.as_ref(), &binding.busy_key());
        if binding.indicate.is_some() && !busy {
            trace!(element = self.name(), "indicator hidden while idle");
            return self.factory.empty();
        }

        let injected = binding
            .get_url
            .as_ref()
            .and(query.data)
            .filter(|data| !data.is_empty());

        let disabled = self.is_button().then(|| match binding.disabled {
            Some(DisabledPolicy::Loading) => mutation.is_pending(),
            _ => busy,
        });

        let actions = Actions {
            engine: Arc::clone(&ctx.engine),
            mutation,
            invalidate: binding.invalidate,
            posts: binding.post_url.is_some(),
        };
        let on_click = (!self.is_form()).then(|| actions.clone().click_handler(on_click));
        let on_submit = Some(actions.submit_handler(on_submit));

        let synthesized = disabled.is_some().then_some("disabled");
        let native = NativeProps {
            attrs: attrs.without(ReservedAttr::all_names().chain(synthesized)),
            children: if injected.is_some() { Vec::new() } else { children },
            inner_html: injected,
            disabled,
            on_click,
            on_submit,
            node_ref,
        };
        trace!(
            element = self.name(),
            %key,
            busy,
            injected = native.inner_html.is_some(),
            disabled = ?native.disabled,
            "render"
        );

        match &self.target {
            Target::Element(kind) => self.factory.create_element(kind, native),
            Target::Component { render, .. } => render(scope, native),
        }
    }
}

impl<F: ElementFactory> fmt::Debug for Enhanced<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enhanced")
            .field("name", &self.name())
            .field("component", &self.kind().is_none())
            .finish()
    }
}

/// A fetch under `key` or an exact-key mutation in flight. Fetches match by
/// prefix, so the empty key tracks every fetch in the cache.
pub fn is_busy(engine: &dyn QueryEngine, key: &QueryKey) -> bool {
    engine.fetching_queries(key) > 0 || engine.in_flight_mutations(key, true) > 0
}

fn transport_error(err: impl fmt::Display) -> QueryError {
    QueryError::Transport(err.to_string())
}

fn read_query_fn(transport: &AbstractTransport, url: Option<&str>) -> QueryFn {
    let transport = Arc::clone(transport);
    let url = url.map(str::to_string);
    Arc::new(move || {
        let transport = Arc::clone(&transport);
        let url = url.clone();
        Box::pin(async move {
            let Some(url) = url else {
                return Ok(None);
            };
            debug!(%url, "read-query");
            transport.get(&url).await.map(Some).map_err(transport_error)
        }) as BoxFuture<'static, QueryResult>
    })
}

fn mutation_fn(transport: &AbstractTransport, url: Option<&str>) -> MutationFn {
    let transport = Arc::clone(transport);
    let url = url.map(str::to_string);
    Arc::new(move |form: Option<FormData>| {
        let transport = Arc::clone(&transport);
        let url = url.clone();
        Box::pin(async move {
            let Some(url) = url else {
                return Ok(None);
            };
            let form = form.unwrap_or_default();
            debug!(%url, fields = form.len(), "mutation");
            transport
                .post(&url, form.fields())
                .await
                .map(Some)
                .map_err(transport_error)
        }) as BoxFuture<'static, QueryResult>
    })
}

fn invalidate(engine: &dyn QueryEngine, target: &Invalidate, result: &str) {
    let key = match target {
        Invalidate::Key(key) => key.clone(),
        Invalidate::With(derive) => derive(result),
    };
    engine.invalidate_queries(&key);
}

/// What the synthesized handlers of one render act on.
#[derive(Clone)]
struct Actions {
    engine: AbstractQueryEngine,
    mutation: MutationHandle,
    invalidate: Option<Invalidate>,
    posts: bool,
}

impl Actions {
    fn click_handler(self, user: Option<EventHandler>) -> EventHandler {
        handler(move |event: &mut Event| {
            if self.posts {
                self.mutate(None);
            } else {
                match &self.invalidate {
                    Some(Invalidate::Key(key)) => self.engine.invalidate_queries(key),
                    Some(Invalidate::With(_)) => {
                        warn!("function-valued invalidation without a mutation skipped")
                    }
                    None => {}
                }
            }
            if let Some(user) = &user {
                user(event);
            }
        })
    }

    /// The user handler runs after the synthesized one whether or not a
    /// post is configured, and sees the default already prevented when it is.
    fn submit_handler(self, user: Option<EventHandler>) -> EventHandler {
        handler(move |event: &mut Event| {
            if self.posts {
                event.prevent_default();
                self.mutate(Some(event.form().clone()));
            }
            if let Some(user) = &user {
                user(event);
            }
        })
    }

    /// Fire the mutation and invalidate once it succeeds. The mutation
    /// counts as in flight as soon as this returns.
    fn mutate(&self, form: Option<FormData>) {
        let Ok(runtime) = Handle::try_current() else {
            warn!("no tokio runtime, mutation not started");
            return;
        };
        let pending = self.mutation.invoke(form);
        let engine = Arc::clone(&self.engine);
        let target = self.invalidate.clone();
        runtime.spawn(async move {
            match pending.await {
                Ok(result) => {
                    if let Some(target) = target {
                        let result = result.as_deref().unwrap_or_default();
                        invalidate(engine.as_ref(), &target, result);
                    }
                }
                Err(err) => debug!(error = %err, "invalidation skipped after failed mutation"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::Binding;
    use crate::context::BindContext;
    use crate::factory::VirtualDom;
    use crate::node::Node;
    use crate::tags::Tag;
    use crate::test_utils::MockTransport;
    use xbind_query::{key, InMemoryQueryClient};

    fn setup() -> (InMemoryQueryClient, MockTransport, Scope) {
        let client = InMemoryQueryClient::new();
        let transport = MockTransport::new();
        let ctx = BindContext::new(Arc::new(client.clone()), Arc::new(transport.clone()));
        (client, transport, Scope::new(ctx))
    }

    fn enhanced(tag: Tag) -> Enhanced<VirtualDom> {
        Enhanced::element(Arc::new(VirtualDom), tag.into())
    }

    #[tokio::test]
    async fn test_reserved_attributes_never_forwarded() {
        let (client, _, scope) = setup();
        let mut props = Props::new().attr("class", "box").binding(
            Binding::new().id(key!["a"]).invalidates(key!["b"]),
        );
        props.attrs.insert("x-get", "/smuggled");
        props.attrs.insert("cache-key", "[]");

        let node = enhanced(Tag::Div).render(&scope, props);
        let element = node.as_element().unwrap();
        let names: Vec<&str> = element.props.attrs.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["class"]);
        assert!(element.props.disabled.is_none());
        client.wait_idle().await;
    }

    #[tokio::test]
    async fn test_button_native_disabled_is_resynthesized() {
        let (_, _, scope) = setup();
        let node = enhanced(Tag::Button).render(&scope, Props::new().attr("disabled", true));
        let element = node.as_element().unwrap();
        assert!(element.attr("disabled").is_none());
        assert_eq!(element.props.disabled, Some(false));
    }

    #[tokio::test]
    async fn test_form_has_no_click_handler() {
        let (_, _, scope) = setup();
        let node = enhanced(Tag::Form).render(&scope, Props::new());
        let element = node.as_element().unwrap();
        assert!(element.props.on_click.is_none());
        assert!(element.props.on_submit.is_some());
    }

    #[tokio::test]
    async fn test_component_receives_cleaned_props() {
        let (_, _, scope) = setup();
        let card = Enhanced::component(Arc::new(VirtualDom), "card", |_, props| {
            Node::Fragment(props.children)
        });
        let node = card.render(
            &scope,
            Props::new().attr("x-id", r#"["c"]"#).child("body"),
        );
        assert_eq!(node.text_content(), "body");
        assert_eq!(card.name(), "card");
        assert!(card.kind().is_none());
    }

    #[tokio::test]
    async fn test_plain_button_tracks_every_fetch() {
        let (client, transport, scope) = setup();
        transport.respond_get("/slow", "x");
        transport.hold();
        enhanced(Tag::Div).render(
            &scope,
            Props::new().binding(Binding::new().get("/slow").id(key!["feed"])),
        );
        assert!(is_busy(&client, &key![]));
        assert!(!is_busy(&client, &key!["other"]));

        let button = enhanced(Tag::Button);
        let node = button.render(&scope, Props::new());
        assert!(node.as_element().unwrap().is_disabled());

        transport.release();
        client.wait_idle().await;
        let node = button.render(&scope, Props::new());
        assert!(!node.as_element().unwrap().is_disabled());
        assert!(!is_busy(&client, &key![]));
    }

    #[tokio::test]
    async fn test_user_submit_handler_runs_after_synthesized() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use xbind_query::FormData;

        let (client, transport, scope) = setup();
        transport.respond_post("/save", "ok");
        let prevented = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&prevented);
        let on_submit = handler(move |event: &mut Event| {
            if event.default_prevented() {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        let posting = enhanced(Tag::Form).render(
            &scope,
            Props::new()
                .binding(Binding::new().post("/save"))
                .on_submit(Arc::clone(&on_submit)),
        );
        let plain = enhanced(Tag::Div).render(&scope, Props::new().on_submit(on_submit));

        posting.submit(FormData::new()).unwrap();
        let event = plain.submit(FormData::new()).unwrap();
        assert!(!event.default_prevented());
        assert_eq!(prevented.load(Ordering::SeqCst), 1);
        client.wait_idle().await;
        assert_eq!(transport.count(), 1);
    }

    #[test]
    fn test_render_outside_runtime_does_not_panic() {
        let (client, transport, scope) = setup();
        transport.respond_get("/data", "<b>1</b>");
        let node = enhanced(Tag::Button).render(
            &scope,
            Props::new().binding(Binding::new().get("/data").post("/save")),
        );
        node.click();
        assert!(client.is_idle());
        assert_eq!(transport.count(), 0);
    }
}
