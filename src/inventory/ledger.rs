//! Stock ledger reconciliation for medicine batches.
//!
//! Pure arithmetic, no IO: availability for an (item, batch) pair is always
//! re-derived from the full event history (receipt, adjustments, dispenses),
//! never read from a cached running balance. Handlers load the event sums
//! inside a transaction and feed them through here before deciding whether a
//! proposed deduction may be persisted.

use serde::{Deserialize, Serialize};

/// Direction of a manual batch correction, independent of dispenses.
/// Stored as text ("Addition" / "Subtraction").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentKind {
    Addition,
    Subtraction,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::Addition => "Addition",
            AdjustmentKind::Subtraction => "Subtraction",
        }
    }
}

/// Reconciled view of one (item, batch) pair's event history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockLedger {
    receipt_quantity: i64,
    additions: i64,
    subtractions: i64,
    dispensed: i64,
}

impl StockLedger {
    pub fn new(receipt_quantity: i64) -> Self {
        Self {
            receipt_quantity,
            ..Self::default()
        }
    }

    /// Builds a ledger directly from pre-summed event totals, the shape the
    /// SQL aggregation queries hand back.
    pub fn from_sums(receipt_quantity: i64, additions: i64, subtractions: i64, dispensed: i64) -> Self {
        Self {
            receipt_quantity,
            additions,
            subtractions,
            dispensed,
        }
    }

    pub fn record_adjustment(&mut self, kind: AdjustmentKind, quantity: i64) {
        match kind {
            AdjustmentKind::Addition => self.additions += quantity,
            AdjustmentKind::Subtraction => self.subtractions += quantity,
        }
    }

    pub fn record_dispense(&mut self, quantity: i64) {
        self.dispensed += quantity;
    }

    /// Signed balance before dispenses: receipt + additions − subtractions.
    /// A negative value here means the adjustment history over-subtracted
    /// (data-entry error); `available` flips it positive, so callers that
    /// care should inspect this first.
    pub fn pre_dispense_balance(&self) -> i64 {
        self.receipt_quantity + self.additions - self.subtractions
    }

    /// Currently available quantity:
    ///
    /// ```text
    /// available = |receipt + Σadditions − Σsubtractions| − Σdispenses
    /// ```
    ///
    /// The absolute value over the pre-dispense balance is carried over from
    /// the system of record as-is; see `pre_dispense_balance` for the hazard.
    pub fn available(&self) -> i64 {
        self.pre_dispense_balance().abs() - self.dispensed
    }

    /// Decision rule for a proposed new deduction: reject when it exceeds
    /// what is currently available.
    pub fn can_deduct(&self, quantity: i64) -> bool {
        quantity <= self.available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_matches_reference_formula() {
        // receipt 100, +10 addition, -5 subtraction, 20 already dispensed:
        // |100 + 10 - 5| - 20 = 85
        let mut ledger = StockLedger::new(100);
        ledger.record_adjustment(AdjustmentKind::Addition, 10);
        ledger.record_adjustment(AdjustmentKind::Subtraction, 5);
        ledger.record_dispense(20);

        assert_eq!(ledger.pre_dispense_balance(), 105);
        assert_eq!(ledger.available(), 85);
    }

    #[test]
    fn deduction_at_exact_availability_is_accepted() {
        let ledger = StockLedger::from_sums(100, 10, 5, 20);
        assert!(ledger.can_deduct(85));
    }

    #[test]
    fn deduction_over_availability_is_rejected() {
        let ledger = StockLedger::from_sums(100, 10, 5, 20);
        assert!(!ledger.can_deduct(86));
    }

    #[test]
    fn from_sums_agrees_with_incremental_recording() {
        let mut incremental = StockLedger::new(50);
        incremental.record_adjustment(AdjustmentKind::Addition, 7);
        incremental.record_adjustment(AdjustmentKind::Addition, 3);
        incremental.record_adjustment(AdjustmentKind::Subtraction, 4);
        incremental.record_dispense(11);
        incremental.record_dispense(9);

        assert_eq!(incremental, StockLedger::from_sums(50, 10, 4, 20));
        assert_eq!(incremental.available(), 36);
    }

    #[test]
    fn dispenses_alone_can_drive_availability_negative() {
        // Nothing clamps the reported figure; a historical over-draw shows
        // up as a negative availability and every new deduction is rejected.
        let ledger = StockLedger::from_sums(10, 0, 0, 15);
        assert_eq!(ledger.available(), -5);
        assert!(!ledger.can_deduct(1));
    }

    #[test]
    fn negative_pre_dispense_balance_flips_positive() {
        // Carried-over behavior from the system of record: a subtraction
        // larger than the receipt produces |negative| before dispenses.
        let ledger = StockLedger::from_sums(10, 0, 25, 0);
        assert_eq!(ledger.pre_dispense_balance(), -15);
        assert_eq!(ledger.available(), 15);
    }

    #[test]
    fn empty_history_availability_is_receipt() {
        let ledger = StockLedger::new(30);
        assert_eq!(ledger.available(), 30);
        assert!(ledger.can_deduct(30));
        assert!(!ledger.can_deduct(31));
    }
}
