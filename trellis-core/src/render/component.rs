//! Component instances.
//!
//! A component node is realized by creating a [`ComponentInstance`], running
//! the component's setup to obtain its data proxy and render function, and
//! then binding rendering to an effect (see
//! [`Renderer::setup_render_effect`](super::Renderer::setup_render_effect)).

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::vnode::{Props, VNode, VNodeType};
use crate::error::{Error, Result};
use crate::reactive::{Reactive, Runner};

/// Render function bound to a component's data proxy.
pub type RenderFn<N> = Box<dyn Fn(&Reactive) -> VNode<N>>;

/// What a component's setup hands back.
pub struct SetupResult<N> {
    /// Reactive state the render function reads from.
    pub proxy: Reactive,
    pub render: RenderFn<N>,
}

/// A stateful component definition.
pub trait Component<N> {
    fn name(&self) -> &str;

    /// Build the component's state and render function.
    fn setup(&self, instance: &ComponentInstance<N>) -> SetupResult<N>;
}

/// Runtime state of one mounted component.
pub struct ComponentInstance<N> {
    uid: u64,
    component: Rc<dyn Component<N>>,
    props: Props,
    parent: Option<Rc<ComponentInstance<N>>>,

    proxy: RefCell<Option<Reactive>>,
    render: RefCell<Option<RenderFn<N>>>,

    is_mounted: Cell<bool>,

    /// Output of the most recent render.
    sub_tree: RefCell<Option<VNode<N>>>,

    /// The render effect.
    update: RefCell<Option<Runner<Result<()>>>>,
}

impl<N: Clone + 'static> ComponentInstance<N> {
    /// Create an instance for a component node, owned by `parent`.
    pub fn new(vnode: &VNode<N>, parent: Option<Rc<ComponentInstance<N>>>) -> Result<Rc<Self>> {
        let VNodeType::Component(component) = vnode.node_type() else {
            return Err(Error::UnsupportedNodeKind {
                kind: vnode.node_type().describe(),
                flags: vnode.shape_flag().bits(),
            });
        };

        static NEXT_UID: AtomicU64 = AtomicU64::new(0);

        Ok(Rc::new(Self {
            uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
            component: Rc::clone(component),
            props: vnode.props().clone(),
            parent,
            proxy: RefCell::new(None),
            render: RefCell::new(None),
            is_mounted: Cell::new(false),
            sub_tree: RefCell::new(None),
            update: RefCell::new(None),
        }))
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn name(&self) -> &str {
        self.component.name()
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    /// The instance that rendered this one.
    pub fn parent(&self) -> Option<&Rc<ComponentInstance<N>>> {
        self.parent.as_ref()
    }

    /// The data proxy set up for this instance.
    pub fn proxy(&self) -> Option<Reactive> {
        self.proxy.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.is_mounted.get()
    }

    /// The most recently rendered tree.
    pub fn sub_tree(&self) -> Ref<'_, Option<VNode<N>>> {
        self.sub_tree.borrow()
    }

    /// The render effect, once bound.
    pub fn update(&self) -> Option<Runner<Result<()>>> {
        self.update.borrow().clone()
    }

    /// Run the render function against the data proxy.
    pub(crate) fn render_sub_tree(&self) -> Result<VNode<N>> {
        let proxy = self.proxy();
        let render = self.render.borrow();
        match (proxy, render.as_ref()) {
            (Some(proxy), Some(render)) => Ok(render(&proxy)),
            _ => Err(Error::MissingRender(self.name().to_owned())),
        }
    }

    pub(crate) fn take_sub_tree(&self) -> Option<VNode<N>> {
        self.sub_tree.borrow_mut().take()
    }

    pub(crate) fn set_sub_tree(&self, tree: VNode<N>) {
        *self.sub_tree.borrow_mut() = Some(tree);
    }

    pub(crate) fn set_mounted(&self, mounted: bool) {
        self.is_mounted.set(mounted);
    }

    pub(crate) fn set_update(&self, runner: Runner<Result<()>>) {
        *self.update.borrow_mut() = Some(runner);
    }

    /// Stop the render effect and release it.
    pub(crate) fn unmount(&self) {
        let update = self.update.borrow_mut().take();
        if let Some(update) = update {
            update.stop();
        }
        self.is_mounted.set(false);
    }
}

/// Run the component's setup and store its proxy and render function.
pub fn setup_component<N: Clone + 'static>(instance: &ComponentInstance<N>) {
    let SetupResult { proxy, render } = instance.component.setup(instance);
    tracing::trace!(component = instance.name(), uid = instance.uid, "setup");
    *instance.proxy.borrow_mut() = Some(proxy);
    *instance.render.borrow_mut() = Some(render);
}

impl<N> fmt::Debug for ComponentInstance<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("uid", &self.uid)
            .field("name", &self.component.name())
            .field("is_mounted", &self.is_mounted.get())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
