//! Per-instance hook storage addressed by call position.
//!
//! Every hook call claims the next slot. The first pass materializes slots;
//! later passes must request the same kinds, in the same order, and the same
//! number of them. Any divergence is reported as a hook order error.

use crate::effects::EffectPhase;
use crate::{InstanceId, RuntimeError};
use std::any::Any;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlotKind {
    State,
    Reducer,
    Effect(EffectPhase),
    Memo,
    Callback,
    Ref,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::State => f.write_str("state"),
            SlotKind::Reducer => f.write_str("reducer"),
            SlotKind::Effect(EffectPhase::Layout) => f.write_str("layout effect"),
            SlotKind::Effect(EffectPhase::Passive) => f.write_str("passive effect"),
            SlotKind::Memo => f.write_str("memo"),
            SlotKind::Callback => f.write_str("callback"),
            SlotKind::Ref => f.write_str("ref"),
        }
    }
}

struct HookSlot {
    kind: SlotKind,
    data: Box<dyn Any>,
}

#[derive(Default)]
pub struct HookSlotStore {
    slots: Vec<HookSlot>,
    cursor: usize,
    /// Slot count of the last completed pass; `None` until the first one ends.
    committed_len: Option<usize>,
}

impl HookSlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn kinds(&self) -> Vec<SlotKind> {
        self.slots.iter().map(|slot| slot.kind).collect()
    }

    pub(crate) fn begin_pass(&mut self) {
        self.cursor = 0;
    }

    /// Claims the slot at the cursor, materializing it with `init` on the
    /// instance's first pass. `init` receives the slot index.
    pub(crate) fn next_slot<T: 'static>(
        &mut self,
        instance: InstanceId,
        kind: SlotKind,
        init: impl FnOnce(usize) -> T,
    ) -> Result<(usize, &mut T), RuntimeError> {
        let index = self.cursor;
        if index == self.slots.len() {
            if let Some(expected) = self.committed_len {
                return Err(RuntimeError::HookCount {
                    instance,
                    expected,
                    found: index + 1,
                });
            }
            log::trace!("{instance}: materializing {kind} slot #{index}");
            self.slots.push(HookSlot {
                kind,
                data: Box::new(init(index)),
            });
        }

        let slot = &mut self.slots[index];
        if slot.kind != kind {
            return Err(RuntimeError::HookOrder {
                instance,
                index,
                expected: slot.kind,
                found: kind,
            });
        }
        self.cursor += 1;
        let value = slot
            .data
            .downcast_mut::<T>()
            .ok_or(RuntimeError::HookType { instance, index })?;
        Ok((index, value))
    }

    /// Closes a pass, checking that it claimed as many slots as the last one.
    pub(crate) fn end_pass(&mut self, instance: InstanceId) -> Result<(), RuntimeError> {
        match self.committed_len {
            Some(expected) if expected != self.cursor => Err(RuntimeError::HookCount {
                instance,
                expected,
                found: self.cursor,
            }),
            _ => {
                self.committed_len = Some(self.cursor);
                Ok(())
            }
        }
    }

    /// Raw access for pending updates that address a slot by index.
    pub(crate) fn slot_data_mut(&mut self, index: usize) -> Option<&mut dyn Any> {
        self.slots.get_mut(index).map(|slot| slot.data.as_mut())
    }

    /// Slots of the given kind, in declaration order.
    pub(crate) fn values_of<T: 'static>(
        &self,
        matches: impl Fn(SlotKind) -> bool,
    ) -> impl Iterator<Item = &T> {
        self.slots
            .iter()
            .filter(move |slot| matches(slot.kind))
            .filter_map(|slot| slot.data.downcast_ref::<T>())
    }
}
