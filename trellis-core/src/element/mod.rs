//! Element Descriptors
//!
//! Descriptors are plain values describing what should be rendered at a tree
//! position. The reconciler consumes them; it never keeps them alive beyond
//! the props and state of the nodes built from them.
//!
//! # Shapes
//!
//! - [`Element`]: a host tag, a component, or a fragment, with key, ref and props.
//! - [`Child`]: what may appear in a `children` slot: an element, text
//!   (strings and numbers), a list, or nothing.
//!
//! Descriptors are normally produced by a markup compiler. The builder
//! methods below and [`Child::from_json`] stand in for it.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::element::{Child, Element};
//!
//! let list: Child = Element::host("ul")
//!     .children(["a", "b"].iter().map(|k| Element::host("li").key(*k).child(*k)))
//!     .into();
//! ```

mod json;

pub use json::ELEMENT_MARKER;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::BoxError;
use crate::hooks::Hooks;
use crate::host::{EventHandler, HostId};

/// Identity of an element among its siblings.
pub type Key = String;

/// What a component function returns.
pub type RenderResult = Result<Child, BoxError>;

type RenderFn = dyn Fn(&mut Hooks<'_>, &Props) -> RenderResult + Send + Sync;

/// A user-defined component.
///
/// Two components are the same type only if they share the same function
/// allocation, so create each component once and clone the handle.
#[derive(Clone)]
pub struct Component {
    name: Arc<str>,
    render: Arc<RenderFn>,
}

impl Component {
    /// Wrap a render function under a display name.
    pub fn new<F>(name: &str, render: F) -> Self
    where
        F: Fn(&mut Hooks<'_>, &Props) -> RenderResult + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            render: Arc::new(render),
        }
    }

    /// Display name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn render(&self, hooks: &mut Hooks<'_>, props: &Props) -> RenderResult {
        (self.render)(hooks, props)
    }

    /// Whether both handles point at the same render function.
    pub fn same_as(&self, other: &Component) -> bool {
        Arc::ptr_eq(&self.render, &other.render)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

/// What kind of thing an element renders.
#[derive(Clone)]
pub enum ElementType {
    /// A host tag such as `"div"`.
    Host(String),
    /// A function component.
    Component(Component),
    /// A grouping with no host instance of its own.
    Fragment,
}

impl PartialEq for ElementType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Host(a), Self::Host(b)) => a == b,
            (Self::Component(a), Self::Component(b)) => a.same_as(b),
            (Self::Fragment, Self::Fragment) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(tag) => write!(f, "<{tag}>"),
            Self::Component(component) => write!(f, "{}", component.name()),
            Self::Fragment => write!(f, "Fragment"),
        }
    }
}

/// Imperative handle to the host instance of an element.
///
/// Set after the element is placed, cleared when it is deleted.
#[derive(Clone, Default)]
pub struct NodeRef(Arc<Mutex<Option<HostId>>>);

impl NodeRef {
    /// Create an empty ref.
    pub fn new() -> Self {
        Self::default()
    }

    /// The attached host instance, if any.
    pub fn get(&self) -> Option<HostId> {
        *self.0.lock()
    }

    pub(crate) fn set(&self, instance: Option<HostId>) {
        *self.0.lock() = instance;
    }

    /// Whether both handles are the same ref.
    pub fn same_as(&self, other: &NodeRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeRef").field(&self.get()).finish()
    }
}

pub(crate) fn same_ref(a: Option<&NodeRef>, b: Option<&NodeRef>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.same_as(b),
        (None, None) => true,
        _ => false,
    }
}

/// Properties of an element: attributes, event handlers and children.
#[derive(Clone, Default)]
pub struct Props {
    attrs: IndexMap<String, Value>,
    handlers: IndexMap<String, EventHandler>,
    children: Child,
}

impl Props {
    /// Empty props.
    pub fn new() -> Self {
        Self::default()
    }

    /// Props of a text node.
    pub fn text(content: impl Into<String>) -> Self {
        Self::with_children(Child::Text(content.into()))
    }

    /// Props holding only children.
    pub fn with_children(children: Child) -> Self {
        Self {
            children,
            ..Self::default()
        }
    }

    /// Look up an attribute.
    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    /// Attributes in insertion order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Set an attribute.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// Look up an event handler by prop name (e.g. `"onClick"`).
    pub fn handler(&self, name: &str) -> Option<&EventHandler> {
        self.handlers.get(name)
    }

    /// Set an event handler.
    pub fn set_handler(&mut self, name: impl Into<String>, handler: EventHandler) {
        self.handlers.insert(name.into(), handler);
    }

    /// The children slot.
    pub fn children(&self) -> &Child {
        &self.children
    }

    /// Replace the children slot.
    pub fn set_children(&mut self, children: Child) {
        self.children = children;
    }

    /// Text content when the children slot holds text.
    pub fn text_content(&self) -> Option<&str> {
        match &self.children {
            Child::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Compare everything but children. Handlers compare by identity.
    pub fn same_attributes(&self, other: &Props) -> bool {
        self.attrs == other.attrs
            && self.handlers.len() == other.handlers.len()
            && self
                .handlers
                .iter()
                .all(|(name, h)| other.handlers.get(name).is_some_and(|o| Arc::ptr_eq(h, o)))
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("attrs", &self.attrs)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("children", &self.children)
            .finish()
    }
}

/// A tree descriptor.
#[derive(Clone, Debug)]
pub struct Element {
    pub element_type: ElementType,
    pub key: Option<Key>,
    pub node_ref: Option<NodeRef>,
    pub props: Props,
}

impl Element {
    /// Describe a host element.
    pub fn host(tag: impl Into<String>) -> Self {
        Self::new(ElementType::Host(tag.into()))
    }

    /// Describe a component with empty props.
    pub fn component(component: &Component) -> Self {
        Self::new(ElementType::Component(component.clone()))
    }

    /// Describe a fragment around `children`.
    pub fn fragment<I, C>(children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        Self::new(ElementType::Fragment).children(children)
    }

    fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            key: None,
            node_ref: None,
            props: Props::default(),
        }
    }

    /// Set the key.
    pub fn key(mut self, key: impl fmt::Display) -> Self {
        self.key = Some(key.to_string());
        self
    }

    /// Attach a ref.
    pub fn node_ref(mut self, node_ref: &NodeRef) -> Self {
        self.node_ref = Some(node_ref.clone());
        self
    }

    /// Set an attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.set_attr(name, value);
        self
    }

    /// Set an event handler under a prop name such as `"onClick"`.
    pub fn on<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut crate::host::Event) + Send + Sync + 'static,
    {
        self.props.set_handler(name, Arc::new(handler));
        self
    }

    /// Set a shared event handler. Passing the same handler on every
    /// render keeps the props equal, so the host is not updated.
    pub fn handler(mut self, name: impl Into<String>, handler: &EventHandler) -> Self {
        self.props.set_handler(name, Arc::clone(handler));
        self
    }

    /// Add one child. A second child turns the slot into a list.
    pub fn child(mut self, child: impl Into<Child>) -> Self {
        let child = child.into();
        self.props.children = match std::mem::take(&mut self.props.children) {
            Child::Empty => child,
            Child::List(mut items) => {
                items.push(child);
                Child::List(items)
            }
            single => Child::List(vec![single, child]),
        };
        self
    }

    /// Set the children slot to a list.
    pub fn children<I, C>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        self.props.children = Child::List(children.into_iter().map(Into::into).collect());
        self
    }

    /// A keyless fragment is transparent when it fills a whole child slot.
    pub(crate) fn is_unkeyed_fragment(&self) -> bool {
        self.key.is_none() && self.element_type == ElementType::Fragment
    }
}

/// Content of a children slot.
#[derive(Clone, Debug, Default)]
pub enum Child {
    /// Nothing (absent, `null` or boolean children).
    #[default]
    Empty,
    /// Text, including stringified numbers.
    Text(String),
    /// A single element.
    Element(Arc<Element>),
    /// Several children. Nested lists become fragments.
    List(Vec<Child>),
    /// A value the reconciler cannot render. Logged and skipped.
    Unsupported(Value),
}

impl Child {
    /// Create a text child.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Whether this slot renders nothing.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Self::Element(Arc::new(element))
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<Child>> for Child {
    fn from(items: Vec<Child>) -> Self {
        Self::List(items)
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

macro_rules! child_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Child {
                fn from(value: $ty) -> Self {
                    Self::Text(value.to_string())
                }
            }
        )*
    };
}

child_from_number!(i32, i64, u32, u64, usize, f64);
