//! Turn-taking state for one task.
//!
//! # Responsibility
//! - Hold the ordered rotation list and current pointer as one value.
//! - Keep pointer arithmetic (advance, removal and replacement adjustment)
//!   pure and independent of storage.
//!
//! # Invariants
//! - `pointer` is in `[0, len)` while the list is non-empty, and 0 while it
//!   is empty.
//! - Slot members are distinct (enforced at persistence).

use crate::model::group::MemberId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One position in a task's rotation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationSlot {
    pub member: MemberId,
    /// Mirrors `Member::is_active`; inactive slots are skip candidates.
    pub active: bool,
}

/// Pointer state that violates rotation invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerOutOfBounds {
    pub pointer: u32,
    pub len: u32,
}

impl Display for PointerOutOfBounds {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rotation pointer {} outside list of length {}",
            self.pointer, self.len
        )
    }
}

impl Error for PointerOutOfBounds {}

/// Ordered rotation list plus current pointer.
///
/// The cyclic pointer over an ordered list is a deliberate simplification:
/// O(1) current-assignee lookup and trivial persistence, where deriving the
/// turn from completion history could not represent membership changes
/// cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotation {
    slots: Vec<RotationSlot>,
    pointer: u32,
}

impl Rotation {
    /// Builds a rotation, rejecting pointers outside the list.
    pub fn new(slots: Vec<RotationSlot>, pointer: u32) -> Result<Self, PointerOutOfBounds> {
        let len = slots.len() as u32;
        let in_bounds = if len == 0 { pointer == 0 } else { pointer < len };
        if !in_bounds {
            return Err(PointerOutOfBounds { pointer, len });
        }
        Ok(Self { slots, pointer })
    }

    pub fn len(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[RotationSlot] {
        &self.slots
    }

    pub fn pointer(&self) -> u32 {
        self.pointer
    }

    /// Slot whose turn it currently is. `None` for an empty list.
    pub fn current(&self) -> Option<RotationSlot> {
        self.slots.get(self.pointer as usize).copied()
    }

    /// Pointer value after one completed turn. `None` for an empty list.
    pub fn advanced_pointer(&self) -> Option<u32> {
        if self.slots.is_empty() {
            None
        } else {
            Some((self.pointer + 1) % self.len())
        }
    }

    pub fn has_active_member(&self) -> bool {
        self.slots.iter().any(|slot| slot.active)
    }

    pub fn contains(&self, member: MemberId) -> bool {
        self.position_of(member).is_some()
    }

    /// Position of `member` in the list, if it holds a slot.
    pub fn position_of(&self, member: MemberId) -> Option<u32> {
        self.slots
            .iter()
            .position(|slot| slot.member == member)
            .map(|position| position as u32)
    }

    /// Pointer value after removing the slot at `removed`.
    ///
    /// Slots before the pointer shift it down by one. Removing the current
    /// slot keeps the index modulo the shorter list, so the next member in
    /// original relative order takes the turn.
    pub fn pointer_after_removal(&self, removed: u32) -> u32 {
        let remaining = self.len().saturating_sub(1);
        if remaining == 0 {
            0
        } else if removed < self.pointer {
            self.pointer - 1
        } else if removed > self.pointer {
            self.pointer
        } else {
            self.pointer % remaining
        }
    }

    /// Pointer value after the slot list is replaced wholesale.
    ///
    /// The current member keeps the turn when still present; otherwise the
    /// old index is clamped modulo the new length.
    pub fn pointer_after_replacement(&self, next: &[MemberId]) -> u32 {
        if next.is_empty() {
            return 0;
        }
        if let Some(current) = self.current() {
            if let Some(position) = next.iter().position(|member| *member == current.member) {
                return position as u32;
            }
        }
        self.pointer % next.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::{Rotation, RotationSlot};
    use uuid::Uuid;

    fn slots(n: usize) -> Vec<RotationSlot> {
        (0..n)
            .map(|_| RotationSlot {
                member: Uuid::new_v4(),
                active: true,
            })
            .collect()
    }

    #[test]
    fn new_rejects_pointer_outside_list() {
        let err = Rotation::new(slots(2), 2).expect_err("pointer == len must be rejected");
        assert_eq!(err.pointer, 2);
        assert_eq!(err.len, 2);

        let err = Rotation::new(Vec::new(), 1).expect_err("empty list requires pointer 0");
        assert_eq!(err.len, 0);
    }

    #[test]
    fn current_is_none_for_empty_list() {
        let rotation = Rotation::new(Vec::new(), 0).unwrap();
        assert!(rotation.current().is_none());
        assert!(rotation.advanced_pointer().is_none());
    }

    #[test]
    fn advanced_pointer_wraps_around() {
        let rotation = Rotation::new(slots(3), 2).unwrap();
        assert_eq!(rotation.advanced_pointer(), Some(0));
    }

    #[test]
    fn removal_before_pointer_shifts_it_down() {
        let rotation = Rotation::new(slots(3), 2).unwrap();
        assert_eq!(rotation.pointer_after_removal(0), 1);
    }

    #[test]
    fn removal_after_pointer_keeps_it() {
        let rotation = Rotation::new(slots(3), 0).unwrap();
        assert_eq!(rotation.pointer_after_removal(2), 0);
    }

    #[test]
    fn removing_current_promotes_next_in_original_order() {
        // [A, B, C] with B current: removing B leaves [A, C] with C current.
        let rotation = Rotation::new(slots(3), 1).unwrap();
        assert_eq!(rotation.pointer_after_removal(1), 1);
    }

    #[test]
    fn removing_current_at_tail_wraps_to_front() {
        let rotation = Rotation::new(slots(3), 2).unwrap();
        assert_eq!(rotation.pointer_after_removal(2), 0);
    }

    #[test]
    fn removing_last_slot_resets_pointer() {
        let rotation = Rotation::new(slots(1), 0).unwrap();
        assert_eq!(rotation.pointer_after_removal(0), 0);
    }

    #[test]
    fn replacement_preserves_current_member() {
        let list = slots(3);
        let rotation = Rotation::new(list.clone(), 1).unwrap();
        let reordered = [list[2].member, list[1].member, list[0].member];
        assert_eq!(rotation.pointer_after_replacement(&reordered), 1);
    }

    #[test]
    fn replacement_clamps_when_current_member_dropped() {
        let list = slots(3);
        let rotation = Rotation::new(list.clone(), 2).unwrap();
        let shorter = [list[0].member, list[1].member];
        assert_eq!(rotation.pointer_after_replacement(&shorter), 0);
    }

    #[test]
    fn replacement_with_empty_list_resets_pointer() {
        let rotation = Rotation::new(slots(2), 1).unwrap();
        assert_eq!(rotation.pointer_after_replacement(&[]), 0);
    }
}
