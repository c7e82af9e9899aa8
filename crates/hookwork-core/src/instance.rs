//! Components, their type-erased elements, and the per-instance record the
//! runtime keeps between renders.

use crate::collections::map::HashSet;
use crate::context::ContextId;
use crate::deps::{Deps, Props};
use crate::effects::EffectCell;
use crate::render_scope::RenderScope;
use crate::slot_store::{HookSlotStore, SlotKind};
use crate::{InstanceId, RuntimeError};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type RenderFn<P, O> = dyn Fn(&mut RenderScope<'_, O>, &P) -> Result<O, RuntimeError>;

struct ComponentDef<P, O> {
    name: &'static str,
    render: Rc<RenderFn<P, O>>,
    memoized: bool,
}

/// A named render function.
///
/// Identity matters: children are matched against the component that mounted
/// them, so create a component once and reuse the handle across renders.
/// [`Component::memo`] yields a distinct component that skips renders while
/// its props compare shallow-equal.
pub struct Component<P, O> {
    def: Rc<ComponentDef<P, O>>,
}

impl<P, O> Clone for Component<P, O> {
    fn clone(&self) -> Self {
        Self {
            def: Rc::clone(&self.def),
        }
    }
}

impl<P, O> fmt::Debug for Component<P, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.def.name)
            .field("memoized", &self.def.memoized)
            .finish()
    }
}

impl<P: Props, O: 'static> Component<P, O> {
    pub fn new(
        name: &'static str,
        render: impl Fn(&mut RenderScope<'_, O>, &P) -> Result<O, RuntimeError> + 'static,
    ) -> Self {
        Self {
            def: Rc::new(ComponentDef {
                name,
                render: Rc::new(render),
                memoized: false,
            }),
        }
    }

    /// The memoized wrapper of this component.
    pub fn memo(&self) -> Self {
        if self.def.memoized {
            return self.clone();
        }
        Self {
            def: Rc::new(ComponentDef {
                name: self.def.name,
                render: Rc::clone(&self.def.render),
                memoized: true,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.def.name
    }

    pub fn is_memoized(&self) -> bool {
        self.def.memoized
    }

    pub(crate) fn element(&self, props: P) -> Box<dyn ErasedElement<O>> {
        Box::new(Element {
            component: self.clone(),
            props,
        })
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.def) as *const ()
    }
}

/// A component paired with the props of one render.
pub(crate) trait ErasedElement<O> {
    fn render(&self, scope: &mut RenderScope<'_, O>) -> Result<O, RuntimeError>;
    fn prop_deps(&self) -> Deps;
    fn component_id(&self) -> *const ();
    fn name(&self) -> &'static str;
    fn is_memoized(&self) -> bool;
    fn props_type(&self) -> &'static str;
    /// Same component with new props; `None` if `props` has the wrong type.
    fn with_props(&self, props: Box<dyn Any>) -> Option<Box<dyn ErasedElement<O>>>;
}

struct Element<P, O> {
    component: Component<P, O>,
    props: P,
}

impl<P: Props, O: 'static> ErasedElement<O> for Element<P, O> {
    fn render(&self, scope: &mut RenderScope<'_, O>) -> Result<O, RuntimeError> {
        (self.component.def.render)(scope, &self.props)
    }

    fn prop_deps(&self) -> Deps {
        self.props.prop_deps()
    }

    fn component_id(&self) -> *const () {
        self.component.identity()
    }

    fn name(&self) -> &'static str {
        self.component.name()
    }

    fn is_memoized(&self) -> bool {
        self.component.is_memoized()
    }

    fn props_type(&self) -> &'static str {
        std::any::type_name::<P>()
    }

    fn with_props(&self, props: Box<dyn Any>) -> Option<Box<dyn ErasedElement<O>>> {
        let props = props.downcast::<P>().ok()?;
        Some(self.component.element(*props))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum ChildKey {
    /// n-th unkeyed child of the parent's render.
    Position(usize),
    Keyed(u64),
}

/// A child as committed by the parent's last successful render.
#[derive(Clone, Debug)]
pub(crate) struct ChildRecord {
    pub(crate) key: ChildKey,
    pub(crate) id: InstanceId,
    pub(crate) component: *const (),
}

/// A child requested by the render in progress.
pub(crate) struct ChildRequest<O> {
    pub(crate) key: ChildKey,
    pub(crate) id: InstanceId,
    pub(crate) reused: bool,
    pub(crate) element: Box<dyn ErasedElement<O>>,
}

impl<O> ChildRequest<O> {
    pub(crate) fn record(&self) -> ChildRecord {
        ChildRecord {
            key: self.key,
            id: self.id,
            component: self.element.component_id(),
        }
    }
}

pub(crate) struct ComponentInstance<O> {
    pub(crate) id: InstanceId,
    pub(crate) parent: Option<InstanceId>,
    pub(crate) depth: usize,
    pub(crate) element: Box<dyn ErasedElement<O>>,
    /// Props handed in by `update` or the parent, applied at the next render.
    pub(crate) pending_element: Option<Box<dyn ErasedElement<O>>>,
    pub(crate) store: HookSlotStore,
    pub(crate) children: Vec<ChildRecord>,
    pub(crate) contexts: HashSet<ContextId>,
    /// Props of the last committed render; kept only for memoized components.
    pub(crate) memo_signature: Option<Deps>,
    pub(crate) mounted: bool,
}

impl<O> ComponentInstance<O> {
    pub(crate) fn new(
        id: InstanceId,
        parent: Option<InstanceId>,
        depth: usize,
        element: Box<dyn ErasedElement<O>>,
    ) -> Self {
        Self {
            id,
            parent,
            depth,
            element,
            pending_element: None,
            store: HookSlotStore::new(),
            children: Vec::new(),
            contexts: HashSet::default(),
            memo_signature: None,
            mounted: false,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.element.name()
    }

    /// Runs the last cleanup of every effect slot, in declaration order.
    pub(crate) fn dispose_effects(&self) {
        log::trace!("{}: disposing effect slots", self.id);
        let cells = self
            .store
            .values_of::<Rc<RefCell<EffectCell>>>(|kind| matches!(kind, SlotKind::Effect(_)));
        for cell in cells {
            EffectCell::dispose(cell);
        }
    }
}
