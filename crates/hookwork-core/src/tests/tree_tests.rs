use super::*;
use crate::deps;
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

fn captured<T: Clone>(slot: &Rc<RefCell<Option<T>>>) -> T {
    slot.borrow().clone().expect("render did not capture a handle")
}

fn label(name: &'static str) -> Component<(bool,), String> {
    Component::new(name, move |_: &mut RenderScope<'_, String>, props: &(bool,)| {
        Ok(format!("{name} {}", props.0))
    })
}

#[test]
fn memoized_child_skips_parent_renders_while_unmemoized_sibling_follows() {
    let memo = label("Memo").memo();
    let plain = label("NoMemo");
    let handles = Rc::new(RefCell::new(None));
    let parent = {
        let handles = Rc::clone(&handles);
        Component::new("Parent", move |scope: &mut RenderScope<'_, String>, _: &()| {
            let (tick, set_tick) = scope.use_state(|| 0)?;
            let (is_login, set_login) = scope.use_state(|| false)?;
            let (is_auth, _) = scope.use_state(|| false)?;
            *handles.borrow_mut() = Some((set_tick, set_login));
            scope.child(&memo, (is_login,));
            scope.child(&plain, (is_auth,));
            Ok(format!("tick {tick}"))
        })
    };
    let mut runtime = Runtime::new(MemoryHost::new());
    let root = runtime.mount(&parent, ()).unwrap();
    let children = runtime.children_of(root).unwrap();
    let (memo_id, plain_id) = (children[0], children[1]);
    let (set_tick, set_login) = captured(&handles);

    runtime.run_task(|| set_tick.update(|tick| tick + 1)).unwrap();
    assert_eq!(runtime.host().render_count(root), 2);
    assert_eq!(runtime.host().render_count(memo_id), 1);
    assert_eq!(runtime.host().render_count(plain_id), 2);

    runtime.run_task(|| set_login.set(true)).unwrap();
    assert_eq!(runtime.host().render_count(memo_id), 2);
    assert_eq!(runtime.host().render_count(plain_id), 3);
    assert_eq!(
        runtime.host().output(memo_id).map(String::as_str),
        Some("Memo true")
    );
    assert_eq!(runtime.children_of(root), Some(vec![memo_id, plain_id]));
    assert_eq!(runtime.parent_of(memo_id), Some(root));
}

#[test]
fn fresh_reference_props_defeat_memoization() {
    let child = Component::new(
        "Styled",
        |_: &mut RenderScope<'_, String>, props: &(Rc<String>,)| Ok(props.0.to_string()),
    )
    .memo();
    let setter = Rc::new(RefCell::new(None));
    let parent = {
        let setter = Rc::clone(&setter);
        Component::new("Parent", move |scope: &mut RenderScope<'_, String>, _: &()| {
            let (tick, set_tick) = scope.use_state(|| 0)?;
            *setter.borrow_mut() = Some(set_tick);
            let shared = scope.use_memo(deps![], || Rc::new(String::from("classic")))?;
            scope.child(&child, (Rc::new(String::from("classic")),));
            scope.child(&child, ((*shared).clone(),));
            Ok(format!("tick {tick}"))
        })
    };
    let mut runtime = Runtime::new(MemoryHost::new());
    let root = runtime.mount(&parent, ()).unwrap();
    let children = runtime.children_of(root).unwrap();
    let set_tick = captured(&setter);

    runtime.run_task(|| set_tick.set(1)).unwrap();
    runtime.run_task(|| set_tick.set(2)).unwrap();

    assert_eq!(runtime.host().render_count(children[0]), 3);
    assert_eq!(runtime.host().render_count(children[1]), 1);
}

#[test]
fn callback_props_keep_memoization_only_when_their_identity_is_stable() {
    let button = Component::new(
        "Button",
        |_: &mut RenderScope<'_, String>, props: &(Callback<()>,)| {
            props.0.call(());
            Ok(String::from("button"))
        },
    )
    .memo();
    let setter = Rc::new(RefCell::new(None));
    let parent = {
        let setter = Rc::clone(&setter);
        Component::new("Parent", move |scope: &mut RenderScope<'_, String>, _: &()| {
            let (tick, set_tick) = scope.use_state(|| 0)?;
            *setter.borrow_mut() = Some(set_tick);
            let cached = scope.use_callback(deps![], |()| {})?;
            let held = scope.use_ref(|| Callback::new(|()| {}))?;
            scope.child(&button, (Callback::new(|()| {}),));
            scope.child(&button, (cached,));
            scope.child(&button, (held.get(),));
            Ok(format!("tick {tick}"))
        })
    };
    let mut runtime = Runtime::new(MemoryHost::new());
    let root = runtime.mount(&parent, ()).unwrap();
    let children = runtime.children_of(root).unwrap();
    let set_tick = captured(&setter);

    runtime.run_task(|| set_tick.set(1)).unwrap();
    runtime.run_task(|| set_tick.set(2)).unwrap();

    assert_eq!(runtime.host().render_count(children[0]), 3);
    assert_eq!(runtime.host().render_count(children[1]), 1);
    assert_eq!(runtime.host().render_count(children[2]), 1);
}

#[test]
fn memoized_child_dirty_with_its_parent_renders_once_in_the_same_pass() {
    let child_setter = Rc::new(RefCell::new(None));
    let child = {
        let child_setter = Rc::clone(&child_setter);
        Component::new("Toggle", move |scope: &mut RenderScope<'_, String>, props: &(bool,)| {
            let (on, set_on) = scope.use_state(|| false)?;
            *child_setter.borrow_mut() = Some(set_on);
            Ok(format!("{} {on}", props.0))
        })
        .memo()
    };
    let parent_setter = Rc::new(RefCell::new(None));
    let parent = {
        let parent_setter = Rc::clone(&parent_setter);
        Component::new("Parent", move |scope: &mut RenderScope<'_, String>, _: &()| {
            let (tick, set_tick) = scope.use_state(|| 0)?;
            *parent_setter.borrow_mut() = Some(set_tick);
            scope.child(&child, (true,));
            Ok(format!("tick {tick}"))
        })
    };
    let mut runtime = Runtime::new(MemoryHost::new());
    let root = runtime.mount(&parent, ()).unwrap();
    let toggle = runtime.children_of(root).unwrap()[0];
    let set_tick = captured(&parent_setter);
    let set_on = captured(&child_setter);
    runtime.host_mut().take_events();

    runtime
        .run_task(|| {
            set_tick.set(1);
            set_on.set(true);
        })
        .unwrap();

    let events = runtime.host_mut().take_events();
    let ids: Vec<InstanceId> = events.iter().map(CommitEvent::id).collect();
    // The child commits during its parent's reconcile, ahead of the parent.
    assert_eq!(ids, vec![toggle, root]);
    assert_eq!(
        runtime.host().output(toggle).map(String::as_str),
        Some("true true")
    );
}

#[test]
fn effects_run_children_first_in_declaration_order() {
    let log = new_log();
    let leaf = {
        let log = Rc::clone(&log);
        Component::new("Leaf", move |scope: &mut RenderScope<'_, ()>, props: &(&'static str,)| {
            let name = props.0;
            let layout = Rc::clone(&log);
            scope.use_layout_effect(deps![], move || {
                layout.borrow_mut().push(format!("{name} layout"))
            })?;
            let passive = Rc::clone(&log);
            scope.use_passive_effect(deps![], move || {
                passive.borrow_mut().push(format!("{name} passive"))
            })?;
            Ok(())
        })
    };
    let parent = {
        let log = Rc::clone(&log);
        Component::new("Parent", move |scope: &mut RenderScope<'_, ()>, _: &()| {
            scope.child(&leaf, ("a",));
            scope.child(&leaf, ("b",));
            let first = Rc::clone(&log);
            scope.use_layout_effect(deps![], move || {
                first.borrow_mut().push("parent layout 1".to_string())
            })?;
            let second = Rc::clone(&log);
            scope.use_layout_effect(deps![], move || {
                second.borrow_mut().push("parent layout 2".to_string())
            })?;
            let passive = Rc::clone(&log);
            scope.use_passive_effect(deps![], move || {
                passive.borrow_mut().push("parent passive".to_string())
            })?;
            Ok(())
        })
    };
    let mut runtime = Runtime::new(MemoryHost::new());
    runtime.mount(&parent, ()).unwrap();
    assert_eq!(
        entries(&log),
        vec!["a layout", "b layout", "parent layout 1", "parent layout 2"]
    );

    runtime.flush_passive_effects().unwrap();
    assert_eq!(
        entries(&log)[4..],
        ["a passive", "b passive", "parent passive"]
    );
}

fn declare_cleanups(
    scope: &mut RenderScope<'_, ()>,
    name: &'static str,
    log: &Log,
) -> Result<(), RuntimeError> {
    for (phase, kind) in [(EffectPhase::Passive, "passive"), (EffectPhase::Layout, "layout")] {
        let log = Rc::clone(log);
        scope.use_effect(phase, deps![], move || {
            EffectCleanup::new(move || log.borrow_mut().push(format!("{name} {kind} cleanup")))
        })?;
    }
    Ok(())
}

#[test]
fn unmount_runs_every_cleanup_once_children_first() {
    let log = new_log();
    let child = {
        let log = Rc::clone(&log);
        Component::new("Child", move |scope: &mut RenderScope<'_, ()>, _: &()| {
            declare_cleanups(scope, "child", &log)
        })
    };
    let parent = {
        let log = Rc::clone(&log);
        Component::new("Parent", move |scope: &mut RenderScope<'_, ()>, _: &()| {
            scope.child(&child, ());
            declare_cleanups(scope, "parent", &log)
        })
    };
    let mut runtime = Runtime::new(MemoryHost::new());
    let root = runtime.mount(&parent, ()).unwrap();
    let child_id = runtime.children_of(root).unwrap()[0];
    runtime.flush_passive_effects().unwrap();
    runtime.unmount(root).unwrap();

    assert_eq!(
        entries(&log),
        vec![
            "child passive cleanup",
            "child layout cleanup",
            "parent passive cleanup",
            "parent layout cleanup",
        ]
    );
    assert!(!runtime.contains(child_id));
    let unmounts: Vec<_> = runtime
        .host()
        .events()
        .iter()
        .filter(|event| matches!(event, CommitEvent::Unmount { .. }))
        .map(CommitEvent::id)
        .collect();
    assert_eq!(unmounts, vec![child_id, root]);
}

#[test]
fn removed_children_are_unmounted_and_return_as_new_instances() {
    let log = new_log();
    let panel = {
        let log = Rc::clone(&log);
        Component::new("Panel", move |scope: &mut RenderScope<'_, String>, _: &()| {
            let log = Rc::clone(&log);
            scope.use_layout_effect(deps![], move || {
                log.borrow_mut().push("open".to_string());
                EffectCleanup::new(move || log.borrow_mut().push("close".to_string()))
            })?;
            Ok("panel".to_string())
        })
    };
    let setter = Rc::new(RefCell::new(None));
    let parent = {
        let setter = Rc::clone(&setter);
        Component::new("Toggle", move |scope: &mut RenderScope<'_, String>, _: &()| {
            let (open, set_open) = scope.use_state(|| true)?;
            *setter.borrow_mut() = Some(set_open);
            if open {
                scope.child(&panel, ());
            }
            Ok(format!("open {open}"))
        })
    };
    let mut runtime = Runtime::new(MemoryHost::new());
    let root = runtime.mount(&parent, ()).unwrap();
    let first = runtime.children_of(root).unwrap()[0];
    let set_open = captured(&setter);

    runtime.run_task(|| set_open.set(false)).unwrap();
    assert!(!runtime.contains(first));
    assert!(!runtime.host().is_mounted(first));
    assert_eq!(runtime.children_of(root), Some(vec![]));

    runtime.run_task(|| set_open.set(true)).unwrap();
    let second = runtime.children_of(root).unwrap()[0];
    assert_ne!(first, second);
    assert_eq!(entries(&log), vec!["open", "close", "open"]);
}

#[test]
fn keyed_children_keep_their_instances_when_reordered() {
    let item = Component::new("Item", |scope: &mut RenderScope<'_, String>, props: &(u32,)| {
        let mounted_as = scope.use_ref(|| props.0)?;
        Ok(format!("{} (mounted as {})", props.0, mounted_as.get()))
    });
    let setter = Rc::new(RefCell::new(None));
    let list = {
        let setter = Rc::clone(&setter);
        Component::new("List", move |scope: &mut RenderScope<'_, String>, _: &()| {
            let (order, set_order) = scope.use_state(|| vec![1u32, 2, 3])?;
            *setter.borrow_mut() = Some(set_order);
            for key in &order {
                scope.child_keyed(key, &item, (*key,));
            }
            Ok(format!("{order:?}"))
        })
    };
    let mut runtime = Runtime::new(MemoryHost::new());
    let root = runtime.mount(&list, ()).unwrap();
    let before = runtime.children_of(root).unwrap();
    let set_order = captured(&setter);

    runtime.run_task(|| set_order.set(vec![3, 1, 2])).unwrap();
    let after = runtime.children_of(root).unwrap();

    assert_eq!(after, vec![before[2], before[0], before[1]]);
    assert!(!runtime
        .host()
        .events()
        .iter()
        .any(|event| matches!(event, CommitEvent::Unmount { .. })));
    assert_eq!(
        runtime.host().output(before[2]).map(String::as_str),
        Some("3 (mounted as 3)")
    );
}

#[test]
fn a_different_component_at_a_position_remounts() {
    let first = Component::new("First", |_: &mut RenderScope<'_, String>, _: &()| {
        Ok("first".to_string())
    });
    let second = Component::new("Second", |_: &mut RenderScope<'_, String>, _: &()| {
        Ok("second".to_string())
    });
    let setter = Rc::new(RefCell::new(None));
    let parent = {
        let setter = Rc::clone(&setter);
        Component::new("Switch", move |scope: &mut RenderScope<'_, String>, _: &()| {
            let (use_second, set_use_second) = scope.use_state(|| false)?;
            *setter.borrow_mut() = Some(set_use_second);
            scope.child(if use_second { &second } else { &first }, ());
            Ok(String::new())
        })
    };
    let mut runtime = Runtime::new(MemoryHost::new());
    let root = runtime.mount(&parent, ()).unwrap();
    let before = runtime.children_of(root).unwrap()[0];
    let set_use_second = captured(&setter);

    runtime.run_task(|| set_use_second.set(true)).unwrap();
    let after = runtime.children_of(root).unwrap()[0];

    assert_ne!(before, after);
    assert_eq!(runtime.name_of(after), Some("Second"));
    assert_eq!(runtime.name_of(before), None);
}

#[derive(Debug, PartialEq)]
struct UserInfo {
    name: &'static str,
    is_admin: bool,
    is_auth: bool,
}

fn guest() -> Rc<UserInfo> {
    Rc::new(UserInfo {
        name: "guest",
        is_admin: false,
        is_auth: false,
    })
}

fn taro() -> Rc<UserInfo> {
    Rc::new(UserInfo {
        name: "taro",
        is_admin: true,
        is_auth: true,
    })
}

#[test]
fn host_provided_context_dirties_subscribers_only_on_change() {
    let user_context = create_context("user", guest);
    let reader = {
        let user_context = user_context.clone();
        Component::new("Profile", move |scope: &mut RenderScope<'_, String>, _: &()| {
            let user = scope.use_context(&user_context);
            Ok(format!("{} admin={}", user.name, user.is_admin))
        })
    };
    let mut runtime = Runtime::new(MemoryHost::new());
    let id = runtime.mount(&reader, ()).unwrap();
    assert_eq!(
        runtime.host().output(id).map(String::as_str),
        Some("guest admin=false")
    );
    assert_eq!(runtime.context_subscribers(&user_context), 1);

    let a = taro();
    runtime.provide(&user_context, Rc::clone(&a));
    assert!(runtime.is_dirty(id));
    runtime.flush().unwrap();

    runtime.provide(&user_context, Rc::clone(&a));
    assert!(!runtime.is_dirty(id));
    runtime.flush().unwrap();
    assert_eq!(runtime.host().render_count(id), 2);

    let b = taro();
    assert_eq!(a, b);
    runtime.provide(&user_context, b);
    assert!(runtime.is_dirty(id));
    runtime.flush().unwrap();
    assert_eq!(runtime.host().render_count(id), 3);
    assert_eq!(
        runtime.host().output(id).map(String::as_str),
        Some("taro admin=true")
    );

    runtime.unmount(id).unwrap();
    assert_eq!(runtime.context_subscribers(&user_context), 0);
}

#[test]
fn memoized_consumer_rerenders_on_context_change_from_a_provider() {
    let user_context = create_context("user", guest);
    let badge = {
        let user_context = user_context.clone();
        Component::new("Badge", move |scope: &mut RenderScope<'_, String>, _: &()| {
            let user = scope.use_context(&user_context);
            Ok(format!("auth={}", user.is_auth))
        })
        .memo()
    };
    let bystander = label("Bystander").memo();
    let setter = Rc::new(RefCell::new(None));
    let app = {
        let user_context = user_context.clone();
        let setter = Rc::clone(&setter);
        Component::new("App", move |scope: &mut RenderScope<'_, String>, _: &()| {
            let (signed_in, set_signed_in) = scope.use_state(|| false)?;
            *setter.borrow_mut() = Some(set_signed_in);
            let user = scope.use_memo(deps![signed_in], || if signed_in { taro() } else { guest() })?;
            scope.provide_context(&user_context, (*user).clone());
            scope.child(&badge, ());
            scope.child(&bystander, (false,));
            Ok(format!("signed_in={signed_in}"))
        })
    };
    let mut runtime = Runtime::new(MemoryHost::new());
    let root = runtime.mount(&app, ()).unwrap();
    let children = runtime.children_of(root).unwrap();
    let (badge_id, bystander_id) = (children[0], children[1]);
    assert_eq!(
        runtime.host().output(badge_id).map(String::as_str),
        Some("auth=false")
    );
    let set_signed_in = captured(&setter);

    runtime.run_task(|| set_signed_in.set(false)).unwrap();
    assert_eq!(runtime.host().render_count(badge_id), 1);

    runtime.run_task(|| set_signed_in.set(true)).unwrap();
    assert_eq!(runtime.host().render_count(badge_id), 2);
    assert_eq!(runtime.host().render_count(bystander_id), 1);
    assert_eq!(
        runtime.host().output(badge_id).map(String::as_str),
        Some("auth=true")
    );
}

#[test]
fn failing_child_keeps_siblings_and_parent_committed() {
    let broken = Component::new("Broken", |_: &mut RenderScope<'_, String>, _: &()| {
        Err(RuntimeError::RenderLoop { passes: 0 })
    });
    let fine = label("Fine");
    let parent = Component::new("Parent", move |scope: &mut RenderScope<'_, String>, _: &()| {
        scope.child(&broken, ());
        scope.child(&fine, (true,));
        Ok("parent".to_string())
    });
    let mut runtime = Runtime::new(MemoryHost::new());

    let err = runtime.mount(&parent, ()).unwrap_err();
    assert_eq!(err, RuntimeError::RenderLoop { passes: 0 });
    let root = runtime.roots()[0];
    let children = runtime.children_of(root).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(
        runtime.host().output(children[0]).map(String::as_str),
        Some("Fine true")
    );
    assert_eq!(runtime.host().output(root).map(String::as_str), Some("parent"));
}
