//! Spendable and stored credit balances.

use nova_defence_core::Credits;

/// Tracks spendable credits and the banked balance that forms the final score.
///
/// Every mutation is check-then-act inside a single tick, so a failed debit
/// leaves both balances untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EconomyLedger {
    current: Credits,
    stored: Credits,
}

impl EconomyLedger {
    /// Opens a ledger with `starting` spendable credits and nothing stored.
    #[must_use]
    pub const fn new(starting: Credits) -> Self {
        Self {
            current: starting,
            stored: Credits::ZERO,
        }
    }

    /// Spendable credits.
    #[must_use]
    pub const fn current(&self) -> Credits {
        self.current
    }

    /// Banked credits.
    #[must_use]
    pub const fn stored(&self) -> Credits {
        self.stored
    }

    /// Adds spendable credits.
    pub fn credit(&mut self, amount: Credits) {
        self.current = self.current.saturating_add(amount);
    }

    /// Removes `amount` if the balance covers it.
    pub fn try_debit(&mut self, amount: Credits) -> bool {
        match self.current.checked_sub(amount) {
            Some(remaining) => {
                self.current = remaining;
                true
            }
            None => false,
        }
    }

    /// Moves the whole spendable balance into storage and returns the amount moved.
    pub fn store_all(&mut self) -> Credits {
        let moved = self.current;
        self.stored = self.stored.saturating_add(moved);
        self.current = Credits::ZERO;
        moved
    }

    /// Moves `amount` into storage if the balance covers it.
    pub fn store_amount(&mut self, amount: Credits) -> bool {
        if !self.try_debit(amount) {
            return false;
        }
        self.stored = self.stored.saturating_add(amount);
        true
    }

    /// Adds a stipend straight to storage without touching spendable credits.
    pub fn store_fixed(&mut self, amount: Credits) {
        self.stored = self.stored.saturating_add(amount);
    }
}
