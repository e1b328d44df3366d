//! Rendered output of the [`VirtualDom`](crate::factory::VirtualDom) factory
//! and the event types handlers receive.
use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};
use xbind_query::FormData;

use crate::attrs::{AttrValue, NativeProps};
use crate::tags::ElementKind;

pub type EventHandler = Arc<dyn Fn(&mut Event) + Send + Sync>;

/// Wrap a closure as an [`EventHandler`].
pub fn handler(f: impl Fn(&mut Event) + Send + Sync + 'static) -> EventHandler {
    Arc::new(f)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Click,
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    kind: EventKind,
    form: FormData,
    default_prevented: bool,
}

impl Event {
    pub fn click() -> Self {
        Self {
            kind: EventKind::Click,
            form: FormData::new(),
            default_prevented: false,
        }
    }

    /// Submission of a form carrying `form` fields.
    pub fn submit(form: FormData) -> Self {
        Self {
            kind: EventKind::Submit,
            form,
            default_prevented: false,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn form(&self) -> &FormData {
        &self.form
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Opaque host slot forwarded untouched to the rendered element.
#[derive(Clone, Default)]
pub struct NodeRef(Arc<Mutex<Option<String>>>);

impl NodeRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, handle: impl Into<String>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle.into());
    }

    pub fn current(&self) -> Option<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Both refs point at the same slot.
    pub fn same(&self, other: &NodeRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeRef").field(&self.current()).finish()
    }
}

#[derive(Debug, Clone)]
pub struct ElementNode {
    pub kind: ElementKind,
    pub props: NativeProps,
}

impl ElementNode {
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.props.attrs.get(name)
    }

    pub fn is_disabled(&self) -> bool {
        self.props.disabled.unwrap_or(false)
    }

    pub fn inner_html(&self) -> Option<&str> {
        self.props.inner_html.as_deref()
    }

    pub fn children(&self) -> &[Node] {
        &self.props.children
    }

    /// Dispatch a click; returns the event after handlers ran.
    pub fn click(&self) -> Event {
        let mut event = Event::click();
        if let Some(on_click) = &self.props.on_click {
            on_click(&mut event);
        }
        event
    }

    pub fn submit(&self, form: FormData) -> Event {
        let mut event = Event::submit(form);
        if let Some(on_submit) = &self.props.on_submit {
            on_submit(&mut event);
        }
        event
    }
}

#[derive(Debug, Clone, Default)]
pub enum Node {
    #[default]
    Empty,
    Text(String),
    Element(Box<ElementNode>),
    Fragment(Vec<Node>),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn element(kind: ElementKind, props: NativeProps) -> Self {
        Node::Element(Box::new(ElementNode { kind, props }))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Node::Empty => true,
            Node::Fragment(nodes) => nodes.iter().all(Node::is_empty),
            Node::Text(_) | Node::Element(_) => false,
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(element) => Some(element.as_ref()),
            _ => None,
        }
    }

    /// First element named `name`, depth first, this node included.
    pub fn find(&self, name: &str) -> Option<&ElementNode> {
        match self {
            Node::Element(element) if element.name() == name => Some(element.as_ref()),
            Node::Element(element) => element.children().iter().find_map(|c| c.find(name)),
            Node::Fragment(nodes) => nodes.iter().find_map(|c| c.find(name)),
            Node::Empty | Node::Text(_) => None,
        }
    }

    /// Visible text; injected markup counts as-is.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Empty => {}
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => match element.inner_html() {
                Some(html) => out.push_str(html),
                None => element.children().iter().for_each(|c| c.collect_text(out)),
            },
            Node::Fragment(nodes) => nodes.iter().for_each(|c| c.collect_text(out)),
        }
    }

    /// Click the root element. `None` for non-element nodes.
    pub fn click(&self) -> Option<Event> {
        self.as_element().map(ElementNode::click)
    }

    pub fn submit(&self, form: FormData) -> Option<Event> {
        self.as_element().map(|element| element.submit(form))
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Empty => {}
            Node::Text(text) => out.push_str(&escape(text)),
            Node::Element(element) => write_element(&element.kind, &element.props, out),
            Node::Fragment(nodes) => nodes.iter().for_each(|c| c.write_html(out)),
        }
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::text(text)
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<Vec<Node>> for Node {
    fn from(nodes: Vec<Node>) -> Self {
        Node::Fragment(nodes)
    }
}

pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Serialize one element. Injected markup is written raw.
pub(crate) fn write_element(kind: &ElementKind, props: &NativeProps, out: &mut String) {
    out.push('<');
    out.push_str(kind.name());
    for (name, value) in props.attrs.iter() {
        match value {
            AttrValue::Bool(false) => {}
            AttrValue::Bool(true) => {
                out.push(' ');
                out.push_str(name);
            }
            value => {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape(&value.to_string()));
                out.push('"');
            }
        }
    }
    if props.disabled == Some(true) {
        out.push_str(" disabled");
    }
    out.push('>');
    if kind.is_void() {
        return;
    }
    match &props.inner_html {
        Some(html) => out.push_str(html),
        None => props.children.iter().for_each(|c| c.write_html(out)),
    }
    out.push_str("</");
    out.push_str(kind.name());
    out.push('>');
}
