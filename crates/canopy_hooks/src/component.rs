//! Hooked components: a behavior wrapping a render function.
//!
//! A component renders on construction and on every props update, and again
//! when the scheduler runs a re-render queued by one of its setters or context
//! subscriptions. The elements it returns are reconciled into a private
//! subtree owned by the component's resource.

use core::cell::RefCell;
use std::rc::{Rc, Weak};

use canopy_tree::{Behavior, Cleanup, Elements, OnUpdate, Subtree, TreeError, TreeOperations};

use crate::hooks::Hooks;
use crate::scheduler::Scheduler;
use crate::slot::{HookState, Rerender};

type RenderFn<P> = dyn Fn(&mut Hooks<'_>, &P) -> Result<Elements, TreeError>;

/// Builds a component behavior named after its props type.
///
/// `render` is called with a fresh [`Hooks`] cursor and the latest props, and
/// returns the elements to reconcile below the component.
///
/// # Example
///
/// ```
/// use canopy_hooks::prelude::*;
/// use canopy_tree::prelude::*;
///
/// let scheduler = Scheduler::new();
/// let counter = component(&scheduler, |hooks: &mut Hooks<'_>, _: &()| {
///     let (count, set_count) = hooks.use_state(0_u32)?;
///     hooks.use_effect(
///         move || {
///             if count < 3 {
///                 set_count.set(count + 1);
///             }
///         },
///         count,
///     )?;
///     Ok(Elements::new())
/// });
///
/// let handle = Handle::new();
/// handle.apply(counter.element(()))?;
///
/// // Each increment queues one re-render.
/// assert_eq!(scheduler.run_until_idle()?, 3);
/// # Ok::<(), TreeError>(())
/// ```
#[must_use]
pub fn component<P, F, R>(scheduler: &Scheduler, render: F) -> Behavior<P>
where
    P: 'static,
    F: Fn(&mut Hooks<'_>, &P) -> Result<R, TreeError> + 'static,
    R: Into<Elements>,
{
    named_component(core::any::type_name::<P>(), scheduler, render)
}

/// Builds a component behavior with a diagnostic name.
#[must_use]
pub fn named_component<P, F, R>(name: &'static str, scheduler: &Scheduler, render: F) -> Behavior<P>
where
    P: 'static,
    F: Fn(&mut Hooks<'_>, &P) -> Result<R, TreeError> + 'static,
    R: Into<Elements>,
{
    let render = erase_render(move |hooks, props| render(hooks, props).map(Into::into));
    let scheduler = scheduler.clone();

    Behavior::named(name, move |on_update: &mut OnUpdate<P>, operations: &TreeOperations| {
        let instance = Instance::mount(name, &scheduler, operations, Rc::clone(&render));

        let target = Rc::clone(&instance);
        on_update.register(move |props: &Rc<P>, _: Option<&Rc<P>>| {
            *target.props.borrow_mut() = Some(Rc::clone(props));
            target.render()
        })?;

        Ok::<_, TreeError>(Cleanup::try_new(move || instance.destroy()))
    })
}

fn erase_render<P, F>(render: F) -> Rc<RenderFn<P>>
where
    F: Fn(&mut Hooks<'_>, &P) -> Result<Elements, TreeError> + 'static,
{
    Rc::new(render)
}

// ─────────────────────────────────────────────────────────────────────────────
// Instance
// ─────────────────────────────────────────────────────────────────────────────

/// One live component: its hook state, latest props and private subtree.
struct Instance<P> {
    state: Rc<HookState>,
    props: RefCell<Option<Rc<P>>>,
    render: Rc<RenderFn<P>>,
    subtree: Subtree,
}

impl<P: 'static> Instance<P> {
    fn mount(
        name: &'static str,
        scheduler: &Scheduler,
        operations: &TreeOperations,
        render: Rc<RenderFn<P>>,
    ) -> Rc<Self> {
        let state = Rc::new(HookState::new(name, scheduler.clone(), operations.clone()));
        let instance = Rc::new(Self {
            state: Rc::clone(&state),
            props: RefCell::new(None),
            render,
            subtree: operations.create_subtree(),
        });
        let weak: Weak<Self> = Rc::downgrade(&instance);
        let target: Weak<dyn Rerender> = weak;
        state.bind(target);
        instance
    }

    fn render(&self) -> Result<(), TreeError> {
        if self.state.is_destroyed() {
            return Ok(());
        }
        let Some(props) = self.props.borrow().clone() else {
            return Ok(());
        };
        self.state.begin_render();
        tracing::debug!(component = self.state.name, "render");

        let elements = {
            let mut hooks = Hooks::new(&self.state);
            let elements = (self.render)(&mut hooks, &*props)?;
            self.state.finish_render(hooks.called())?;
            elements
        };
        self.subtree.apply(elements)
    }

    fn destroy(&self) -> Result<(), TreeError> {
        let mut result = Ok(());
        for cleanup in self.state.tear_down() {
            let outcome = cleanup.run();
            if result.is_ok() {
                result = outcome;
            }
        }
        result.and(self.subtree.apply(Elements::new()))
    }
}

impl<P: 'static> Rerender for Instance<P> {
    fn run_scheduled(&self) -> Result<(), TreeError> {
        // A synchronous render since the task was queued already consumed it.
        if !self.state.is_pending() || self.state.is_destroyed() {
            return Ok(());
        }
        self.render()
    }
}
