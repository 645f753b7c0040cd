//! Integration Tests for the Update Loop
//!
//! These tests drive the public API end to end: reactive state feeds
//! effects, and component render effects feed the renderer.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{json, Value};

use trellis_core::reactive::{stop, EffectOptions, Reactive, Record, Runtime};
use trellis_core::render::{
    Component, ComponentInstance, HostOps, Props, Renderer, SetupResult, VNode,
};
use trellis_core::{props, Result, RuntimeConfig};

fn record(value: Value) -> Record {
    serde_json::from_value(value).unwrap()
}

/// Host adapter that keeps a log of operations as strings.
#[derive(Default)]
struct LogHost {
    next: Cell<u32>,
    log: RefCell<Vec<String>>,
}

impl LogHost {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    fn push(&self, entry: String) {
        self.log.borrow_mut().push(entry);
    }
}

impl HostOps for LogHost {
    type Node = u32;

    fn create_element(&self, tag: &str) -> Result<u32> {
        let id = self.next.get() + 1;
        self.next.set(id);
        self.push(format!("create {id} {tag}"));
        Ok(id)
    }

    fn create_text(&self, text: &str) -> Result<u32> {
        let id = self.next.get() + 1;
        self.next.set(id);
        self.push(format!("text {id} {text:?}"));
        Ok(id)
    }

    fn insert(&self, child: &u32, parent: &u32) -> Result<()> {
        self.push(format!("insert {child} into {parent}"));
        Ok(())
    }

    fn remove(&self, node: &u32) -> Result<()> {
        self.push(format!("remove {node}"));
        Ok(())
    }

    fn set_element_text(&self, node: &u32, text: &str) -> Result<()> {
        self.push(format!("set_text {node} {text:?}"));
        Ok(())
    }

    fn patch_prop(&self, node: &u32, key: &str, prev: Option<&Value>, next: Option<&Value>) -> Result<()> {
        let show = |value: Option<&Value>| value.map_or("removed".to_owned(), Value::to_string);
        self.push(format!("prop {node} {key} {} -> {}", show(prev), show(next)));
        Ok(())
    }
}

/// Test the basic reactive loop: a write re-runs the effect that read it.
#[test]
fn effect_follows_reactive_write() {
    let runtime = Runtime::new();
    let user = runtime.reactive_from(record(json!({ "age": 10 })));
    let next_age = Rc::new(Cell::new(0));

    let reader = user.clone();
    let slot = Rc::clone(&next_age);
    runtime.effect(move || {
        let age = reader.get_as::<i64>("age").unwrap().unwrap_or_default();
        slot.set(age + 1);
    });
    assert_eq!(next_age.get(), 11);

    user.update("age", |age| json!(age.and_then(Value::as_i64).unwrap_or_default() + 1));
    assert_eq!(next_age.get(), 12);
}

/// Test that every write re-runs the effect exactly once, synchronously.
#[test]
fn one_rerun_per_write() {
    let runtime = Runtime::new();
    let obj = runtime.reactive_from(record(json!({ "k": 0 })));
    let runs = Rc::new(Cell::new(0));

    let reader = obj.clone();
    let count = Rc::clone(&runs);
    let runner = runtime.effect(move || {
        reader.get("k");
        count.set(count.get() + 1);
    });

    for value in 1..=5 {
        obj.set("k", value);
        assert_eq!(runs.get(), 1 + value as usize);
    }
    assert_eq!(runner.run_count(), 6);
}

/// Test that the same record is wrapped once and shares subscriptions.
#[test]
fn rewrapping_shares_subscriptions() {
    let runtime = Runtime::new();
    let target = Rc::new(RefCell::new(record(json!({ "x": 1 }))));
    let first = runtime.reactive(&target);
    let second = runtime.reactive(&target);
    assert!(first.ptr_eq(&second));

    let seen = Rc::new(Cell::new(0));
    let reader = first.clone();
    let slot = Rc::clone(&seen);
    runtime.effect(move || slot.set(reader.get_as::<i64>("x").unwrap().unwrap_or_default()));

    second.set("x", 7);
    assert_eq!(seen.get(), 7);
}

/// Test scheduler, stop and on_stop together.
#[test]
fn scheduled_effect_lifecycle() {
    let runtime = Runtime::new();
    let obj = runtime.reactive_from(record(json!({ "foo": 1 })));
    let dummy = Rc::new(Cell::new(0));
    let queue = Rc::new(RefCell::new(Vec::new()));
    let stopped = Rc::new(Cell::new(0));

    let reader = obj.clone();
    let slot = Rc::clone(&dummy);
    let pending = Rc::clone(&queue);
    let stop_count = Rc::clone(&stopped);
    let runner = runtime.effect_with(
        move || {
            let foo = reader.get_as::<i64>("foo").unwrap().unwrap_or_default();
            slot.set(foo);
            foo
        },
        EffectOptions::new()
            .scheduler(move |effect| pending.borrow_mut().push(effect.clone()))
            .on_stop(move || stop_count.set(stop_count.get() + 1)),
    );

    obj.set("foo", 2);
    obj.set("foo", 3);
    assert_eq!(dummy.get(), 1);
    assert_eq!(queue.borrow().len(), 2);

    // Drain the queue the way a batching scheduler would.
    let jobs: Vec<_> = queue.borrow_mut().drain(..).collect();
    jobs.iter().for_each(|job| job.run());
    assert_eq!(dummy.get(), 3);
    assert_eq!(runner.run(), 3);

    stop(&runner);
    stop(&runner);
    assert_eq!(stopped.get(), 1);

    obj.set("foo", 4);
    assert!(queue.borrow().is_empty());
    assert_eq!(runner.run(), 4);
}

/// Test that the write-skip option is off unless configured.
#[test]
fn unchanged_writes_follow_configuration() {
    for (skip, expected_runs) in [(false, 2), (true, 1)] {
        let runtime = Runtime::with_config(RuntimeConfig::default().skip_unchanged_writes(skip));
        let obj = runtime.reactive_from(record(json!({ "v": "same" })));

        let reader = obj.clone();
        let runner = runtime.effect(move || {
            reader.get("v");
        });

        obj.set("v", "same");
        assert_eq!(runner.run_count(), expected_runs);
    }
}

struct Profile {
    runtime: Runtime,
    state: RefCell<Option<Reactive>>,
}

impl Component<u32> for Profile {
    fn name(&self) -> &str {
        "Profile"
    }

    fn setup(&self, instance: &ComponentInstance<u32>) -> SetupResult<u32> {
        let name = instance.props().get("name").cloned().unwrap_or(Value::Null);
        let proxy = self.runtime.reactive_from(record(json!({ "name": name, "admin": false })));
        *self.state.borrow_mut() = Some(proxy.clone());

        SetupResult {
            proxy,
            render: Box::new(|proxy: &Reactive| {
                let name = proxy.get_as::<String>("name").ok().flatten().unwrap_or_default();
                let admin = proxy.get("admin") == Some(Value::Bool(true));
                let mut attrs = props! { "class" => "profile" };
                if admin {
                    attrs.insert("data-admin".to_owned(), Value::Bool(true));
                }
                VNode::element("div", attrs, format!("hello {name}"))
            }),
        }
    }
}

/// Test the full loop: mount, then a reactive write re-diffs the tree.
#[test]
fn component_render_effect_end_to_end() {
    let runtime = Runtime::new();
    let renderer = Renderer::new(runtime.clone(), LogHost::default());
    let profile = Rc::new(Profile {
        runtime: runtime.clone(),
        state: RefCell::new(None),
    });

    let vnode = VNode::component(profile.clone() as Rc<dyn Component<u32>>, props! { "name" => "ada" });
    let instance = ComponentInstance::new(&vnode, None).unwrap();
    trellis_core::render::setup_component(&instance);
    assert!(!instance.is_mounted());

    renderer.setup_render_effect(&instance, &0).unwrap();

    assert!(instance.is_mounted());
    assert_eq!(
        renderer.host().take(),
        vec![
            "create 1 div",
            "set_text 1 \"hello ada\"",
            "prop 1 class removed -> \"profile\"",
            "insert 1 into 0",
        ]
    );

    let state = profile.state.borrow().clone().unwrap();
    state.set("name", "grace");
    assert_eq!(renderer.host().take(), vec!["set_text 1 \"hello grace\""]);

    state.set("admin", true);
    assert_eq!(renderer.host().take(), vec!["prop 1 data-admin removed -> true"]);

    state.set("admin", false);
    assert_eq!(renderer.host().take(), vec!["prop 1 data-admin true -> removed"]);

    let tree = instance.sub_tree();
    assert_eq!(tree.as_ref().and_then(|t| t.el()), Some(1));
}

/// Test that a render reading nothing reactive is never re-run by writes.
#[test]
fn unrelated_writes_do_not_rerender() {
    let runtime = Runtime::new();
    let renderer = Renderer::new(runtime.clone(), LogHost::default());
    let profile = Rc::new(Profile {
        runtime: runtime.clone(),
        state: RefCell::new(None),
    });
    let vnode = VNode::component(profile.clone() as Rc<dyn Component<u32>>, Props::new());

    renderer.render(&vnode, &0).unwrap();
    renderer.host().take();

    let unrelated = runtime.reactive_from(record(json!({ "x": 1 })));
    unrelated.set("x", 2);
    assert!(renderer.host().take().is_empty());

    let update = vnode.component_instance().and_then(|i| i.update()).unwrap();
    assert_eq!(update.run_count(), 1);
}

/// Test a mixed tree: fragment, text node, and element children.
#[test]
fn mounts_mixed_tree() {
    let renderer = Renderer::new(Runtime::new(), LogHost::default());
    let tree = VNode::element(
        "main",
        props! { "id" => "app" },
        vec![
            VNode::fragment(vec![VNode::text("a"), VNode::text("b")]),
            VNode::element("p", Props::new(), "c"),
        ],
    );

    renderer.render(&tree, &0).unwrap();

    assert_eq!(
        renderer.host().take(),
        vec![
            "create 1 main",
            "text 2 \"a\"",
            "insert 2 into 1",
            "text 3 \"b\"",
            "insert 3 into 1",
            "create 4 p",
            "set_text 4 \"c\"",
            "insert 4 into 1",
            "prop 1 id removed -> \"app\"",
            "insert 1 into 0",
        ]
    );
}

/// Test that unmounting a fragment removes each of its children.
#[test]
fn replacing_fragment_children_removes_them() {
    let renderer = Renderer::new(Runtime::new(), LogHost::default());
    let old = VNode::element(
        "div",
        Props::new(),
        vec![VNode::fragment(vec![VNode::text("a"), VNode::text("b")])],
    );
    renderer.render(&old, &0).unwrap();
    renderer.host().take();

    let new = VNode::element("div", Props::new(), "done");
    renderer.patch(Some(&old), &new, &0, None).unwrap();

    assert_eq!(
        renderer.host().take(),
        vec!["remove 2", "remove 3", "set_text 1 \"done\""]
    );
}
