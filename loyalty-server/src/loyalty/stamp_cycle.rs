//! Stamp card cycle arithmetic
//!
//! A card holds `N` stamps. Reaching exactly `N` leaves the card full (N/N);
//! anything past `N` rolls over, possibly several cards in one event.

use super::error::{LedgerError, LedgerResult};
use shared::models::StampCard;

/// Upper bound on stamps awarded by a single event
pub const MAX_STAMPS_PER_EVENT: i32 = 10_000;

/// Result of applying one stamp event to a card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardAdvance {
    pub final_stamps: i32,
    pub previous_cycle: i32,
    pub new_cycle: i32,
    pub cycles_completed: i32,
    pub card_was_reset: bool,
}

impl CardAdvance {
    pub fn card(&self, stamps_required: i32) -> StampCard {
        StampCard {
            stamps: self.final_stamps,
            card_cycle_number: self.new_cycle,
            stamps_required,
        }
    }
}

pub fn validate_stamps_to_add(stamps_to_add: i32) -> LedgerResult<()> {
    if stamps_to_add < 1 {
        return Err(LedgerError::InvalidInput(format!(
            "stamps must be >= 1, got {stamps_to_add}"
        )));
    }
    if stamps_to_add > MAX_STAMPS_PER_EVENT {
        return Err(LedgerError::InvalidInput(format!(
            "stamps must be <= {MAX_STAMPS_PER_EVENT}, got {stamps_to_add}"
        )));
    }
    Ok(())
}

/// Apply `stamps_to_add` to the card at `(stamps, card_cycle_number)`.
pub fn advance_card(
    stamps: i32,
    card_cycle_number: i32,
    stamps_to_add: i32,
    stamps_required: i32,
) -> LedgerResult<CardAdvance> {
    validate_stamps_to_add(stamps_to_add)?;
    if stamps_required < 1 {
        return Err(LedgerError::InvalidInput(format!(
            "stamps_required must be >= 1, got {stamps_required}"
        )));
    }

    let new_total = stamps + stamps_to_add;
    if new_total <= stamps_required {
        return Ok(CardAdvance {
            final_stamps: new_total,
            previous_cycle: card_cycle_number,
            new_cycle: card_cycle_number,
            cycles_completed: 0,
            card_was_reset: false,
        });
    }

    let full_cards_completed = new_total / stamps_required;
    Ok(CardAdvance {
        final_stamps: new_total % stamps_required,
        previous_cycle: card_cycle_number,
        new_cycle: card_cycle_number + full_cards_completed,
        cycles_completed: full_cards_completed,
        card_was_reset: true,
    })
}
