//! Server slot count for front-ends that show a fixed number of server
//! input groups.

use strum::{Display, EnumString};

/// Most server slots a front-end offers.
pub const MAX_SERVER_SLOTS: usize = 3;

/// Fewest server slots shown; the first slot is always visible.
pub const MIN_SERVER_SLOTS: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SlotAction {
    Add,
    Remove,
}

/// Apply `action` to the current slot count, clamped to
/// `MIN_SERVER_SLOTS..=MAX_SERVER_SLOTS`.
pub fn reduce(count: usize, action: SlotAction) -> usize {
    let next = match action {
        SlotAction::Add => count.saturating_add(1),
        SlotAction::Remove => count.saturating_sub(1),
    };
    next.clamp(MIN_SERVER_SLOTS, MAX_SERVER_SLOTS)
}

/// What a front-end should show for a given slot count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotVisibility {
    pub count: usize,
    /// Visibility of each slot, first slot first.
    pub slots: [bool; MAX_SERVER_SLOTS],
    pub can_add: bool,
    pub can_remove: bool,
}

impl SlotVisibility {
    pub fn derive(count: usize) -> Self {
        let count = count.clamp(MIN_SERVER_SLOTS, MAX_SERVER_SLOTS);
        let mut slots = [false; MAX_SERVER_SLOTS];
        for (index, visible) in slots.iter_mut().enumerate() {
            *visible = index < count;
        }
        Self {
            count,
            slots,
            can_add: count < MAX_SERVER_SLOTS,
            can_remove: count > MIN_SERVER_SLOTS,
        }
    }
}
