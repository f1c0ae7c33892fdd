//! Per-component hook storage and re-render scheduling.

use core::any::Any;
use core::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use canopy_tree::{Cleanup, TreeError, TreeOperations};

use crate::error::{HookError, HookKind};
use crate::scheduler::Scheduler;

/// One hook's persistent storage.
pub(crate) enum Slot {
    State(Box<dyn Any>),
    Effect {
        deps: Option<Box<dyn Any>>,
        cleanup: Option<Cleanup>,
    },
    Memo(Rc<dyn Any>),
}

impl Slot {
    pub(crate) fn kind(&self) -> HookKind {
        match self {
            Self::State(_) => HookKind::State,
            Self::Effect { .. } => HookKind::Effect,
            Self::Memo(_) => HookKind::Memo,
        }
    }
}

/// Something that can re-render a component when its queued task fires.
pub(crate) trait Rerender {
    fn run_scheduled(&self) -> Result<(), TreeError>;
}

/// The state shared by a component's render pass, its setters and its
/// context subscriptions.
pub(crate) struct HookState {
    pub(crate) name: &'static str,
    slots: RefCell<Vec<Slot>>,
    first_render: Cell<bool>,
    pending: Cell<bool>,
    destroyed: Cell<bool>,
    scheduler: Scheduler,
    pub(crate) operations: TreeOperations,
    rerender: RefCell<Option<Weak<dyn Rerender>>>,
}

impl HookState {
    pub(crate) fn new(name: &'static str, scheduler: Scheduler, operations: TreeOperations) -> Self {
        Self {
            name,
            slots: RefCell::new(Vec::new()),
            first_render: Cell::new(true),
            pending: Cell::new(false),
            destroyed: Cell::new(false),
            scheduler,
            operations,
            rerender: RefCell::new(None),
        }
    }

    pub(crate) fn bind(&self, target: Weak<dyn Rerender>) {
        *self.rerender.borrow_mut() = Some(target);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle flags
    // ─────────────────────────────────────────────────────────────────────

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.get()
    }

    /// Clears the pending flag; called at the start of every render.
    pub(crate) fn begin_render(&self) {
        self.pending.set(false);
    }

    /// Locks in the slot layout after the first successful render.
    pub(crate) fn finish_render(&self, called: usize) -> Result<(), HookError> {
        let expected = self.slots.borrow().len();
        if !self.first_render.get() && called != expected {
            return Err(HookError::HookCountChanged {
                expected,
                found: called,
            });
        }
        self.first_render.set(false);
        Ok(())
    }

    /// Marks the component destroyed and returns every effect cleanup still
    /// registered, in slot order.
    pub(crate) fn tear_down(&self) -> Vec<Cleanup> {
        self.destroyed.set(true);
        self.slots
            .borrow_mut()
            .iter_mut()
            .filter_map(|slot| match slot {
                Slot::Effect { cleanup, .. } => cleanup.take(),
                Slot::State(_) | Slot::Memo(_) => None,
            })
            .collect()
    }

    /// Queues one re-render unless one is already pending.
    pub(crate) fn schedule(&self) {
        if self.destroyed.get() {
            return;
        }
        if self.pending.replace(true) {
            tracing::trace!(component = self.name, "re-render already pending");
            return;
        }
        let Some(target) = self.rerender.borrow().clone() else {
            return;
        };
        tracing::trace!(component = self.name, "re-render scheduled");
        self.scheduler.defer(move || match target.upgrade() {
            Some(component) => component.run_scheduled(),
            None => Ok(()),
        });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Slots
    // ─────────────────────────────────────────────────────────────────────

    /// Validates that `slot` may be used by a hook of `kind`. Returns `true` if
    /// the slot does not exist yet and must be created.
    pub(crate) fn claim(&self, slot: usize, kind: HookKind) -> Result<bool, HookError> {
        let slots = self.slots.borrow();
        match slots.get(slot) {
            Some(existing) if existing.kind() == kind => Ok(false),
            Some(existing) => Err(HookError::SlotKindMismatch {
                slot,
                expected: kind,
                found: existing.kind(),
            }),
            None if self.first_render.get() => Ok(true),
            None => Err(HookError::HookCountChanged {
                expected: slots.len(),
                found: slot + 1,
            }),
        }
    }

    pub(crate) fn push(&self, slot: Slot) {
        self.slots.borrow_mut().push(slot);
    }

    pub(crate) fn read_state<T: Clone + 'static>(&self, slot: usize) -> Result<T, HookError> {
        match self.slots.borrow().get(slot) {
            Some(Slot::State(value)) => value.downcast_ref::<T>().cloned().ok_or(
                HookError::SlotTypeMismatch {
                    slot,
                    expected: core::any::type_name::<T>(),
                },
            ),
            other => Err(mismatch(slot, HookKind::State, other)),
        }
    }

    pub(crate) fn write_state<T: 'static>(&self, slot: usize, value: T) -> Result<(), HookError> {
        match self.slots.borrow_mut().get_mut(slot) {
            Some(Slot::State(stored)) if stored.is::<T>() => {
                *stored = Box::new(value);
                Ok(())
            }
            Some(Slot::State(_)) => Err(HookError::SlotTypeMismatch {
                slot,
                expected: core::any::type_name::<T>(),
            }),
            other => Err(mismatch(slot, HookKind::State, other.map(|s| &*s))),
        }
    }

    pub(crate) fn read_memo<T: 'static>(&self, slot: usize) -> Result<Rc<T>, HookError> {
        match self.slots.borrow().get(slot) {
            Some(Slot::Memo(value)) => Rc::clone(value).downcast::<T>().map_err(|_| {
                HookError::SlotTypeMismatch {
                    slot,
                    expected: core::any::type_name::<T>(),
                }
            }),
            other => Err(mismatch(slot, HookKind::Memo, other)),
        }
    }

    /// Returns `None` if `deps` equals the stored dependencies; otherwise takes
    /// the previous cleanup out of the slot so the caller can run it.
    pub(crate) fn effect_changed<D: PartialEq + 'static>(
        &self,
        slot: usize,
        deps: &D,
    ) -> Result<Option<Option<Cleanup>>, HookError> {
        match self.slots.borrow_mut().get_mut(slot) {
            Some(Slot::Effect { deps: stored, cleanup }) => {
                let unchanged = stored
                    .as_ref()
                    .and_then(|stored| stored.downcast_ref::<D>())
                    .is_some_and(|stored| stored == deps);
                if unchanged {
                    Ok(None)
                } else {
                    Ok(Some(cleanup.take()))
                }
            }
            other => Err(mismatch(slot, HookKind::Effect, other.map(|s| &*s))),
        }
    }

    pub(crate) fn store_effect(&self, slot: usize, deps: Box<dyn Any>, cleanup: Option<Cleanup>) {
        if let Some(entry) = self.slots.borrow_mut().get_mut(slot) {
            *entry = Slot::Effect {
                deps: Some(deps),
                cleanup,
            };
        }
    }
}

fn mismatch(slot: usize, expected: HookKind, found: Option<&Slot>) -> HookError {
    match found {
        Some(found) => HookError::SlotKindMismatch {
            slot,
            expected,
            found: found.kind(),
        },
        None => HookError::SlotTypeMismatch {
            slot,
            expected: "an initialized slot",
        },
    }
}
