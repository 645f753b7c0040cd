//! Virtual Nodes
//!
//! A [`VNode`] is a lightweight description of one unit of presentable
//! structure. It is generic over `N`, the host adapter's node handle, so
//! that the node can remember the host node it was realized into.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use indexmap::IndexMap;
use serde_json::Value;

use super::component::{Component, ComponentInstance};

bitflags! {
    /// Classification of a node and its children.
    ///
    /// `patch` only inspects these bits; it never defines new ones.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShapeFlags: u8 {
        const ELEMENT            = 1;
        const STATEFUL_COMPONENT = 1 << 2;
        const TEXT_CHILDREN      = 1 << 3;
        const ARRAY_CHILDREN     = 1 << 4;
    }
}

/// Attributes of a node, in declaration order.
pub type Props = IndexMap<String, Value>;

/// What a node stands for.
pub enum VNodeType<N> {
    /// Children are mounted straight into the parent container.
    Fragment,
    /// A bare text node; the payload lives in [`Children::Text`].
    Text,
    /// A host element with the given tag.
    Element(String),
    /// A stateful component.
    Component(Rc<dyn Component<N>>),
}

impl<N> VNodeType<N> {
    /// Short label used in logs and errors.
    pub fn describe(&self) -> String {
        match self {
            VNodeType::Fragment => "Fragment".to_owned(),
            VNodeType::Text => "Text".to_owned(),
            VNodeType::Element(tag) => format!("<{tag}>"),
            VNodeType::Component(component) => format!("component {}", component.name()),
        }
    }
}

impl<N> Clone for VNodeType<N> {
    fn clone(&self) -> Self {
        match self {
            VNodeType::Fragment => VNodeType::Fragment,
            VNodeType::Text => VNodeType::Text,
            VNodeType::Element(tag) => VNodeType::Element(tag.clone()),
            VNodeType::Component(component) => VNodeType::Component(Rc::clone(component)),
        }
    }
}

impl<N> fmt::Display for VNodeType<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl<N> fmt::Debug for VNodeType<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNodeType::Fragment => f.write_str("Fragment"),
            VNodeType::Text => f.write_str("Text"),
            VNodeType::Element(tag) => f.debug_tuple("Element").field(tag).finish(),
            VNodeType::Component(component) => {
                f.debug_tuple("Component").field(&component.name()).finish()
            }
        }
    }
}

/// Children of a node: nothing, a literal text payload, or a list.
pub enum Children<N> {
    None,
    Text(String),
    Array(Vec<VNode<N>>),
}

impl<N> Children<N> {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Children::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> &[VNode<N>] {
        match self {
            Children::Array(children) => children,
            _ => &[],
        }
    }

    fn shape(&self) -> ShapeFlags {
        match self {
            Children::None => ShapeFlags::empty(),
            Children::Text(_) => ShapeFlags::TEXT_CHILDREN,
            Children::Array(_) => ShapeFlags::ARRAY_CHILDREN,
        }
    }
}

impl<N> From<&str> for Children<N> {
    fn from(text: &str) -> Self {
        Children::Text(text.to_owned())
    }
}

impl<N> From<String> for Children<N> {
    fn from(text: String) -> Self {
        Children::Text(text)
    }
}

impl<N> From<Vec<VNode<N>>> for Children<N> {
    fn from(children: Vec<VNode<N>>) -> Self {
        Children::Array(children)
    }
}

impl<N: fmt::Debug> fmt::Debug for Children<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Children::None => f.write_str("None"),
            Children::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Children::Array(children) => f.debug_list().entries(children).finish(),
        }
    }
}

/// A node in the virtual tree.
pub struct VNode<N> {
    node_type: VNodeType<N>,
    props: Props,
    children: Children<N>,
    shape_flag: ShapeFlags,

    /// Host node this vnode was realized into. Empty before mount.
    el: RefCell<Option<N>>,

    /// Instance created for a component node when it was mounted.
    component: RefCell<Option<Rc<ComponentInstance<N>>>>,
}

impl<N: Clone> VNode<N> {
    /// Create a node, deriving its shape flags from its type and children.
    pub fn new(node_type: VNodeType<N>, props: Props, children: Children<N>) -> Self {
        let kind = match &node_type {
            VNodeType::Element(_) => ShapeFlags::ELEMENT,
            VNodeType::Component(_) => ShapeFlags::STATEFUL_COMPONENT,
            VNodeType::Fragment | VNodeType::Text => ShapeFlags::empty(),
        };
        let shape_flag = kind | children.shape();
        Self::from_parts(node_type, props, children, shape_flag)
    }

    /// Create a node with shape flags classified elsewhere. The flags are
    /// taken as given.
    pub fn from_parts(
        node_type: VNodeType<N>,
        props: Props,
        children: Children<N>,
        shape_flag: ShapeFlags,
    ) -> Self {
        Self {
            node_type,
            props,
            children,
            shape_flag,
            el: RefCell::new(None),
            component: RefCell::new(None),
        }
    }

    pub fn element(tag: impl Into<String>, props: Props, children: impl Into<Children<N>>) -> Self {
        Self::new(VNodeType::Element(tag.into()), props, children.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(VNodeType::Text, Props::new(), Children::Text(text.into()))
    }

    pub fn fragment(children: Vec<VNode<N>>) -> Self {
        Self::new(VNodeType::Fragment, Props::new(), Children::Array(children))
    }

    pub fn component(component: Rc<dyn Component<N>>, props: Props) -> Self {
        Self::new(VNodeType::Component(component), props, Children::None)
    }

    pub fn node_type(&self) -> &VNodeType<N> {
        &self.node_type
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn children(&self) -> &Children<N> {
        &self.children
    }

    pub fn shape_flag(&self) -> ShapeFlags {
        self.shape_flag
    }

    /// The host node this vnode was realized into, if mounted.
    pub fn el(&self) -> Option<N> {
        self.el.borrow().clone()
    }

    pub fn set_el(&self, el: Option<N>) {
        *self.el.borrow_mut() = el;
    }

    /// The component instance mounted for this node, if any.
    pub fn component_instance(&self) -> Option<Rc<ComponentInstance<N>>> {
        self.component.borrow().clone()
    }

    pub(crate) fn set_component_instance(&self, instance: Option<Rc<ComponentInstance<N>>>) {
        *self.component.borrow_mut() = instance;
    }
}

impl<N: fmt::Debug> fmt::Debug for VNode<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNode")
            .field("type", &self.node_type)
            .field("props", &self.props)
            .field("children", &self.children)
            .field("shape_flag", &self.shape_flag)
            .field("el", &*self.el.borrow())
            .finish()
    }
}

/// Build [`Props`] from `key => value` pairs.
///
/// ```rust,ignore
/// let props = props! { "id" => "root", "tabindex" => 0 };
/// ```
#[macro_export]
macro_rules! props {
    () => { $crate::render::Props::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut props = $crate::render::Props::new();
        $(props.insert(::std::string::String::from($key), ::serde_json::Value::from($value));)+
        props
    }};
}
