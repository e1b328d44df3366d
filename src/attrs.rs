//! The attribute contract of bound elements.
//!
//! Props are split into two disjoint halves: native [`Attributes`] that are
//! forwarded to the rendered element, and the typed reserved [`Binding`]
//! that drives fetching, mutations and invalidation. Reserved names supplied
//! through [`Props::attr`] are always routed into the binding, and
//! [`Attributes::without`] strips them again before forwarding, so they can
//! never leak into rendered markup.
use indexmap::IndexMap;
use std::{fmt, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::warn;
use xbind_query::{QueryKey, QueryOptions};

use crate::node::{EventHandler, Node, NodeRef};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttrError {
    #[error("Unknown disabled policy: {0}")]
    UnknownPolicy(String),
    #[error("Invalid cache key for {attr}: {value}")]
    InvalidKey { attr: &'static str, value: String },
    #[error("Invalid duration for {attr}: {value}")]
    InvalidDuration { attr: &'static str, value: String },
    #[error("Unknown response type: {0}")]
    InvalidResponseKind(String),
}

/// Reserved declarative attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedAttr {
    Get,
    Post,
    Id,
    Interval,
    Disabled,
    Indicate,
    Invalidate,
    Confirm,
    ResponseType,
    ReloadTrigger,
    TriggerFrom,
    State,
}

impl ReservedAttr {
    pub const ALL: [ReservedAttr; 12] = [
        ReservedAttr::Get,
        ReservedAttr::Post,
        ReservedAttr::Id,
        ReservedAttr::Interval,
        ReservedAttr::Disabled,
        ReservedAttr::Indicate,
        ReservedAttr::Invalidate,
        ReservedAttr::Confirm,
        ReservedAttr::ResponseType,
        ReservedAttr::ReloadTrigger,
        ReservedAttr::TriggerFrom,
        ReservedAttr::State,
    ];

    /// Canonical `x-*` attribute name.
    pub fn name(&self) -> &'static str {
        match self {
            ReservedAttr::Get => "x-get",
            ReservedAttr::Post => "x-post",
            ReservedAttr::Id => "x-id",
            ReservedAttr::Interval => "x-interval",
            ReservedAttr::Disabled => "x-disabled",
            ReservedAttr::Indicate => "x-indicate",
            ReservedAttr::Invalidate => "x-invalidate",
            ReservedAttr::Confirm => "x-confirm",
            ReservedAttr::ResponseType => "x-response-type",
            ReservedAttr::ReloadTrigger => "x-reload-trigger",
            ReservedAttr::TriggerFrom => "x-trigger-from",
            ReservedAttr::State => "x-state",
        }
    }

    /// Descriptive alias accepted alongside the canonical name.
    pub fn alias(&self) -> &'static str {
        match self {
            ReservedAttr::Get => "get-url",
            ReservedAttr::Post => "post-url",
            ReservedAttr::Id => "cache-key",
            ReservedAttr::Interval => "poll-interval",
            ReservedAttr::Disabled => "disabled-policy",
            ReservedAttr::Indicate => "indicate-keys",
            ReservedAttr::Invalidate => "invalidate-targets",
            ReservedAttr::Confirm => "confirm",
            ReservedAttr::ResponseType => "response-kind",
            ReservedAttr::ReloadTrigger => "reload-trigger",
            ReservedAttr::TriggerFrom => "trigger-from",
            ReservedAttr::State => "state",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|attr| attr.name() == name || attr.alias() == name)
    }

    /// Every name, canonical and alias, that must not reach native markup.
    pub fn all_names() -> impl Iterator<Item = &'static str> {
        Self::ALL
            .into_iter()
            .flat_map(|attr| [attr.name(), attr.alias()])
    }
}

impl fmt::Display for ReservedAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(value) => f.write_str(value),
            AttrValue::Int(value) => write!(f, "{value}"),
            AttrValue::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(value.into())
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

/// Native attributes, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(IndexMap<String, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Option<AttrValue> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy without the excluded names, keeping order.
    pub fn without<'a>(&self, excluded: impl IntoIterator<Item = &'a str>) -> Self {
        let excluded: Vec<&str> = excluded.into_iter().collect();
        Self(
            self.0
                .iter()
                .filter(|(name, _)| !excluded.contains(&name.as_str()))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisabledPolicy {
    /// Disabled while the element's own mutation is pending (`loading` or `load`)
    Loading,
    /// Disabled while anything under the key is busy
    Key(QueryKey),
}

impl DisabledPolicy {
    pub fn parse(text: &str) -> Result<Self, AttrError> {
        match text.trim() {
            "loading" | "load" => Ok(DisabledPolicy::Loading),
            other => other
                .parse()
                .map(DisabledPolicy::Key)
                .map_err(|_| AttrError::UnknownPolicy(other.to_string())),
        }
    }

    pub fn key(&self) -> Option<&QueryKey> {
        match self {
            DisabledPolicy::Loading => None,
            DisabledPolicy::Key(key) => Some(key),
        }
    }
}

pub type InvalidateFn = Arc<dyn Fn(&str) -> QueryKey + Send + Sync>;

/// What to invalidate after a successful mutation.
#[derive(Clone)]
pub enum Invalidate {
    Key(QueryKey),
    /// Derived from the mutation's result text
    With(InvalidateFn),
}

impl Invalidate {
    pub fn with(derive: impl Fn(&str) -> QueryKey + Send + Sync + 'static) -> Self {
        Invalidate::With(Arc::new(derive))
    }
}

impl fmt::Debug for Invalidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invalidate::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Invalidate::With(_) => f.write_str("With(..)"),
        }
    }
}

/// Confirmation gate. Reserved; bound elements do not interpret it.
#[derive(Clone)]
pub enum Confirm {
    Message(String),
    Predicate(Arc<dyn Fn() -> bool + Send + Sync>),
}

impl fmt::Debug for Confirm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confirm::Message(message) => f.debug_tuple("Message").field(message).finish(),
            Confirm::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Html,
    Rsc,
}

impl ResponseKind {
    pub fn parse(text: &str) -> Result<Self, AttrError> {
        match text.trim() {
            "html" => Ok(ResponseKind::Html),
            "rsc" => Ok(ResponseKind::Rsc),
            other => Err(AttrError::InvalidResponseKind(other.to_string())),
        }
    }
}

fn parse_key(attr: ReservedAttr, text: &str) -> Result<QueryKey, AttrError> {
    text.parse().map_err(|_| AttrError::InvalidKey {
        attr: attr.name(),
        value: text.to_string(),
    })
}

/// Milliseconds, integer or float notation (`20000`, `20e3`).
fn parse_millis(attr: ReservedAttr, text: &str) -> Result<Duration, AttrError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|millis| millis.is_finite() && *millis >= 0.0)
        .and_then(|millis| Duration::try_from_secs_f64(millis / 1000.0).ok())
        .ok_or_else(|| AttrError::InvalidDuration {
            attr: attr.name(),
            value: text.to_string(),
        })
}

/// The reserved declarations of one element.
#[derive(Debug, Clone, Default)]
pub struct Binding {
    pub get_url: Option<String>,
    pub post_url: Option<String>,
    pub cache_key: Option<QueryKey>,
    pub poll_interval: Option<Duration>,
    pub disabled: Option<DisabledPolicy>,
    pub indicate: Option<QueryKey>,
    pub invalidate: Option<Invalidate>,
    pub confirm: Option<Confirm>,
    pub response_kind: Option<ResponseKind>,
    pub reload_trigger: Option<String>,
    pub trigger_from: Option<String>,
    pub state: Option<String>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(mut self, url: impl Into<String>) -> Self {
        self.get_url = Some(url.into());
        self
    }

    pub fn post(mut self, url: impl Into<String>) -> Self {
        self.post_url = Some(url.into());
        self
    }

    pub fn id(mut self, key: QueryKey) -> Self {
        self.cache_key = Some(key);
        self
    }

    pub fn interval(mut self, every: Duration) -> Self {
        self.poll_interval = Some(every);
        self
    }

    pub fn disabled_when(mut self, policy: DisabledPolicy) -> Self {
        self.disabled = Some(policy);
        self
    }

    pub fn indicate_on(mut self, key: QueryKey) -> Self {
        self.indicate = Some(key);
        self
    }

    pub fn invalidates(mut self, key: QueryKey) -> Self {
        self.invalidate = Some(Invalidate::Key(key));
        self
    }

    pub fn invalidates_with(
        mut self,
        derive: impl Fn(&str) -> QueryKey + Send + Sync + 'static,
    ) -> Self {
        self.invalidate = Some(Invalidate::with(derive));
        self
    }

    pub fn confirm_with(mut self, message: impl Into<String>) -> Self {
        self.confirm = Some(Confirm::Message(message.into()));
        self
    }

    /// Apply the text form of a reserved attribute.
    pub fn set(&mut self, attr: ReservedAttr, text: &str) -> Result<(), AttrError> {
        match attr {
            ReservedAttr::Get => self.get_url = Some(text.to_string()),
            ReservedAttr::Post => self.post_url = Some(text.to_string()),
            ReservedAttr::Id => self.cache_key = Some(parse_key(attr, text)?),
            ReservedAttr::Interval => self.poll_interval = Some(parse_millis(attr, text)?),
            ReservedAttr::Disabled => self.disabled = Some(DisabledPolicy::parse(text)?),
            ReservedAttr::Indicate => self.indicate = Some(parse_key(attr, text)?),
            ReservedAttr::Invalidate => {
                self.invalidate = Some(Invalidate::Key(parse_key(attr, text)?))
            }
            ReservedAttr::Confirm => self.confirm = Some(Confirm::Message(text.to_string())),
            ReservedAttr::ResponseType => {
                self.response_kind = Some(ResponseKind::parse(text)?)
            }
            ReservedAttr::ReloadTrigger => self.reload_trigger = Some(text.to_string()),
            ReservedAttr::TriggerFrom => self.trigger_from = Some(text.to_string()),
            ReservedAttr::State => self.state = Some(text.to_string()),
        }
        Ok(())
    }

    /// The key this element reads and writes; empty when undeclared.
    pub fn key(&self) -> QueryKey {
        self.cache_key.clone().unwrap_or_default()
    }

    /// Key whose busy state gates visibility and the disabled flag.
    pub fn busy_key(&self) -> QueryKey {
        self.indicate
            .clone()
            .or_else(|| self.disabled.as_ref().and_then(|p| p.key().cloned()))
            .unwrap_or_default()
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            enabled: self.get_url.is_some(),
            refetch_on_focus: false,
            refetch_interval: self.poll_interval,
        }
    }
}

/// Everything a bound element receives for one render.
#[derive(Clone, Default)]
pub struct Props {
    pub attrs: Attributes,
    pub binding: Binding,
    pub children: Vec<Node>,
    pub on_click: Option<EventHandler>,
    pub on_submit: Option<EventHandler>,
    pub node_ref: Option<NodeRef>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute by name. Reserved names go to the binding; malformed
    /// reserved values are logged and dropped.
    pub fn attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        if let Err(err) = self.apply(name, value.into()) {
            warn!(attr = name, error = %err, "ignoring malformed attribute");
        }
        self
    }

    pub fn try_attr(
        mut self,
        name: &str,
        value: impl Into<AttrValue>,
    ) -> Result<Self, AttrError> {
        self.apply(name, value.into())?;
        Ok(self)
    }

    /// Leaves `self` untouched on error.
    fn apply(&mut self, name: &str, value: AttrValue) -> Result<(), AttrError> {
        match ReservedAttr::from_name(name) {
            Some(attr) => self.binding.set(attr, &value.to_string()),
            None => {
                self.attrs.insert(name, value);
                Ok(())
            }
        }
    }

    pub fn binding(mut self, binding: Binding) -> Self {
        self.binding = binding;
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn on_click(mut self, handler: EventHandler) -> Self {
        self.on_click = Some(handler);
        self
    }

    pub fn on_submit(mut self, handler: EventHandler) -> Self {
        self.on_submit = Some(handler);
        self
    }

    pub fn node_ref(mut self, node_ref: NodeRef) -> Self {
        self.node_ref = Some(node_ref);
        self
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("attrs", &self.attrs)
            .field("binding", &self.binding)
            .field("children", &self.children)
            .field("on_click", &self.on_click.is_some())
            .field("on_submit", &self.on_submit.is_some())
            .field("node_ref", &self.node_ref)
            .finish()
    }
}

/// The cleaned prop set handed to an [`ElementFactory`](crate::factory::ElementFactory).
#[derive(Clone, Default)]
pub struct NativeProps {
    pub attrs: Attributes,
    pub children: Vec<Node>,
    /// Raw markup, rendered in place of children
    pub inner_html: Option<String>,
    pub disabled: Option<bool>,
    pub on_click: Option<EventHandler>,
    pub on_submit: Option<EventHandler>,
    pub node_ref: Option<NodeRef>,
}

impl fmt::Debug for NativeProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeProps")
            .field("attrs", &self.attrs)
            .field("children", &self.children)
            .field("inner_html", &self.inner_html)
            .field("disabled", &self.disabled)
            .field("on_click", &self.on_click.is_some())
            .field("on_submit", &self.on_submit.is_some())
            .field("node_ref", &self.node_ref)
            .finish()
    }
}
