//! Reconciliation Engine
//!
//! [`Renderer::patch`] converges the host tree to a new virtual tree,
//! reusing what it can from the old one. Dispatch is on the new node's type:
//!
//! - Fragment: children are mounted straight into the container.
//! - Text: a host text node is created and inserted.
//! - Element: mounted when there is no old node, otherwise updated in place
//!   (children first, then attributes).
//! - Component: an instance is created and set up, and its rendering is
//!   bound to an effect so reactive writes re-render it.
//!
//! Child lists are not keyed. Going from one list to another removes every
//! old child and mounts every new one.

use std::rc::Rc;

use super::component::{setup_component, ComponentInstance};
use super::host::HostOps;
use super::vnode::{Children, Props, ShapeFlags, VNode, VNodeType};
use crate::error::{Error, Result};
use crate::reactive::{EffectOptions, Runtime};

type Instance<H> = ComponentInstance<<H as HostOps>::Node>;

struct RendererInner<H> {
    runtime: Runtime,
    host: H,
}

/// Drives a host adapter from virtual trees.
///
/// Cloning is cheap; clones share the host and the runtime.
pub struct Renderer<H> {
    inner: Rc<RendererInner<H>>,
}

impl<H> Clone for Renderer<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<H: HostOps + 'static> Renderer<H> {
    pub fn new(runtime: Runtime, host: H) -> Self {
        Self {
            inner: Rc::new(RendererInner { runtime, host }),
        }
    }

    pub fn host(&self) -> &H {
        &self.inner.host
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Mount `vnode` into `container`.
    pub fn render(&self, vnode: &VNode<H::Node>, container: &H::Node) -> Result<()> {
        self.patch(None, vnode, container, None)
    }

    /// Apply the host operations that turn `old` into `new`.
    ///
    /// Host mutations already applied are not rolled back if a later step
    /// fails.
    pub fn patch(
        &self,
        old: Option<&VNode<H::Node>>,
        new: &VNode<H::Node>,
        container: &H::Node,
        parent: Option<&Rc<Instance<H>>>,
    ) -> Result<()> {
        let flags = new.shape_flag();
        tracing::trace!(kind = %new.node_type(), update = old.is_some(), "patch");

        match new.node_type() {
            VNodeType::Fragment => self.process_fragment(new, container, parent),
            VNodeType::Text => self.process_text(new, container),
            VNodeType::Element(_) if flags.contains(ShapeFlags::ELEMENT) => {
                self.process_element(old, new, container, parent)
            }
            VNodeType::Component(_) if flags.contains(ShapeFlags::STATEFUL_COMPONENT) => {
                self.mount_component(new, container, parent).map(|_| ())
            }
            other => Err(unsupported(other, flags)),
        }
    }

    fn process_fragment(
        &self,
        vnode: &VNode<H::Node>,
        container: &H::Node,
        parent: Option<&Rc<Instance<H>>>,
    ) -> Result<()> {
        match vnode.children() {
            Children::Array(children) => self.mount_children(children, container, parent),
            Children::None => Ok(()),
            Children::Text(_) => Err(unsupported(vnode.node_type(), vnode.shape_flag())),
        }
    }

    fn process_text(&self, vnode: &VNode<H::Node>, container: &H::Node) -> Result<()> {
        let Children::Text(text) = vnode.children() else {
            return Err(unsupported(vnode.node_type(), vnode.shape_flag()));
        };

        let el = self.inner.host.create_text(text)?;
        vnode.set_el(Some(el.clone()));
        self.inner.host.insert(&el, container)
    }

    fn process_element(
        &self,
        old: Option<&VNode<H::Node>>,
        new: &VNode<H::Node>,
        container: &H::Node,
        parent: Option<&Rc<Instance<H>>>,
    ) -> Result<()> {
        match old {
            None => self.mount_element(new, container, parent),
            Some(old) => self.patch_element(old, new, parent),
        }
    }

    fn mount_element(
        &self,
        vnode: &VNode<H::Node>,
        container: &H::Node,
        parent: Option<&Rc<Instance<H>>>,
    ) -> Result<()> {
        let VNodeType::Element(tag) = vnode.node_type() else {
            return Err(unsupported(vnode.node_type(), vnode.shape_flag()));
        };
        let host = &self.inner.host;

        let el = host.create_element(tag)?;
        vnode.set_el(Some(el.clone()));

        let flags = vnode.shape_flag();
        match vnode.children() {
            Children::Text(text) if flags.contains(ShapeFlags::TEXT_CHILDREN) => {
                host.set_element_text(&el, text)?;
            }
            Children::Array(children) if flags.contains(ShapeFlags::ARRAY_CHILDREN) => {
                self.mount_children(children, &el, parent)?;
            }
            _ => {}
        }

        for (key, value) in vnode.props() {
            host.patch_prop(&el, key, None, Some(value))?;
        }

        host.insert(&el, container)
    }

    fn mount_children(
        &self,
        children: &[VNode<H::Node>],
        container: &H::Node,
        parent: Option<&Rc<Instance<H>>>,
    ) -> Result<()> {
        children
            .iter()
            .try_for_each(|child| self.patch(None, child, container, parent))
    }

    fn patch_element(
        &self,
        old: &VNode<H::Node>,
        new: &VNode<H::Node>,
        parent: Option<&Rc<Instance<H>>>,
    ) -> Result<()> {
        let el = old.el().ok_or_else(|| Error::NotMounted {
            kind: old.node_type().describe(),
        })?;
        new.set_el(Some(el.clone()));

        self.patch_children(old, new, &el, parent)?;
        self.patch_props(&el, old.props(), new.props())
    }

    fn patch_children(
        &self,
        old: &VNode<H::Node>,
        new: &VNode<H::Node>,
        container: &H::Node,
        parent: Option<&Rc<Instance<H>>>,
    ) -> Result<()> {
        let prev_flag = old.shape_flag();
        let next_flag = new.shape_flag();
        let host = &self.inner.host;

        if next_flag.contains(ShapeFlags::TEXT_CHILDREN) {
            let next_text = new.children().as_text().unwrap_or_default();
            if prev_flag.contains(ShapeFlags::ARRAY_CHILDREN) {
                self.unmount_children(old.children().as_slice())?;
            }
            if old.children().as_text() != Some(next_text) {
                host.set_element_text(container, next_text)?;
            }
        } else if next_flag.contains(ShapeFlags::ARRAY_CHILDREN) {
            let next_children = new.children().as_slice();
            if prev_flag.contains(ShapeFlags::TEXT_CHILDREN) {
                host.set_element_text(container, "")?;
            } else if prev_flag.contains(ShapeFlags::ARRAY_CHILDREN) {
                self.unmount_children(old.children().as_slice())?;
            }
            self.mount_children(next_children, container, parent)?;
        } else if prev_flag.contains(ShapeFlags::ARRAY_CHILDREN) {
            self.unmount_children(old.children().as_slice())?;
        } else if prev_flag.contains(ShapeFlags::TEXT_CHILDREN) {
            host.set_element_text(container, "")?;
        }

        Ok(())
    }

    fn patch_props(&self, el: &H::Node, old: &Props, new: &Props) -> Result<()> {
        let host = &self.inner.host;

        for (key, next) in new {
            let prev = old.get(key);
            if prev != Some(next) {
                host.patch_prop(el, key, prev, Some(next))?;
            }
        }

        for (key, prev) in old {
            if !new.contains_key(key) {
                host.patch_prop(el, key, Some(prev), None)?;
            }
        }

        Ok(())
    }

    fn unmount_children(&self, children: &[VNode<H::Node>]) -> Result<()> {
        children.iter().try_for_each(|child| self.unmount(child))
    }

    /// Remove a node's host nodes and stop every render effect at or below
    /// it.
    fn unmount(&self, vnode: &VNode<H::Node>) -> Result<()> {
        stop_components(vnode);
        self.remove_host_nodes(vnode)
    }

    /// Detach the topmost host nodes a node was realized into.
    ///
    /// Descendants of an element go with it, so only fragments and
    /// components need to be looked through.
    fn remove_host_nodes(&self, vnode: &VNode<H::Node>) -> Result<()> {
        match vnode.node_type() {
            VNodeType::Fragment => vnode
                .children()
                .as_slice()
                .iter()
                .try_for_each(|child| self.remove_host_nodes(child)),
            VNodeType::Component(_) => {
                let Some(instance) = vnode.component_instance() else {
                    return Ok(());
                };
                let tree = instance.sub_tree();
                match tree.as_ref() {
                    Some(tree) => self.remove_host_nodes(tree),
                    None => Ok(()),
                }
            }
            _ => match vnode.el() {
                Some(el) => self.inner.host.remove(&el),
                None => Ok(()),
            },
        }
    }

    /// Create, set up and render a component node.
    pub fn mount_component(
        &self,
        vnode: &VNode<H::Node>,
        container: &H::Node,
        parent: Option<&Rc<Instance<H>>>,
    ) -> Result<Rc<Instance<H>>> {
        let instance = ComponentInstance::new(vnode, parent.cloned())?;
        setup_component(&instance);
        vnode.set_component_instance(Some(Rc::clone(&instance)));

        self.setup_render_effect(&instance, container)?;

        let el = instance.sub_tree().as_ref().and_then(VNode::el);
        vnode.set_el(el);
        Ok(instance)
    }

    /// Bind the instance's rendering to an effect and run it once.
    ///
    /// The first run mounts the rendered tree into `container`. Every later
    /// run, whether forced or caused by a write to state the last render
    /// read, diffs the stored tree against a fresh one. No scheduler is
    /// installed, so re-renders happen synchronously inside the write.
    pub fn setup_render_effect(&self, instance: &Rc<Instance<H>>, container: &H::Node) -> Result<()> {
        let renderer = self.clone();
        let target = Rc::clone(instance);
        let container = container.clone();

        let (runner, first) = self.inner.runtime.create_effect(
            move || {
                let result = renderer.render_component(&target, &container);
                if let Err(err) = &result {
                    tracing::error!(component = target.name(), uid = target.uid(), %err, "render failed");
                }
                result
            },
            EffectOptions::default(),
        );

        instance.set_update(runner);
        first
    }

    fn render_component(&self, instance: &Rc<Instance<H>>, container: &H::Node) -> Result<()> {
        let next = instance.render_sub_tree()?;

        if !instance.is_mounted() {
            tracing::debug!(component = instance.name(), uid = instance.uid(), "mount");
            let result = self.patch(None, &next, container, Some(instance));
            instance.set_sub_tree(next);
            result?;
            instance.set_mounted(true);
        } else {
            tracing::debug!(component = instance.name(), uid = instance.uid(), "update");
            let prev = instance.take_sub_tree();
            let result = self.patch(prev.as_ref(), &next, container, Some(instance));
            instance.set_sub_tree(next);
            result?;
        }

        Ok(())
    }
}

/// Stop the render effect of every component instance in a tree, including
/// those nested inside other components' output.
fn stop_components<N: Clone + 'static>(vnode: &VNode<N>) {
    if let Some(instance) = vnode.component_instance() {
        instance.unmount();
        let tree = instance.sub_tree();
        if let Some(tree) = tree.as_ref() {
            stop_components(tree);
        }
    }

    vnode.children().as_slice().iter().for_each(stop_components);
}

fn unsupported<N>(node_type: &VNodeType<N>, flags: ShapeFlags) -> Error {
    Error::UnsupportedNodeKind {
        kind: node_type.describe(),
        flags: flags.bits(),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
