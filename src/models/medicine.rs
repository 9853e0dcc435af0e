use sqlx::FromRow;

/// Summed event history for one (item, batch), as returned by the
/// reconciliation aggregation query.
#[derive(Debug, FromRow)]
pub struct LedgerSums {
    pub receipt_quantity: i64,
    pub additions: i64,
    pub subtractions: i64,
    pub dispensed: i64,
}
