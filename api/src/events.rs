use crate::tipset::ExtendedTipset;
use crate::transaction::Transaction;

/// Derives domain events (deals, datacap movements, sector changes) from a tipset's
/// transactions.
/// Generators see every transaction and must skip, not fail on, those whose metadata does not
/// describe the event they are looking for.
pub trait EventGenerator {
    type Event;

    /// Scans the transactions of one tipset, returning the events found in transaction order.
    fn generate(
        &self,
        tipset: &ExtendedTipset,
        transactions: &[Transaction],
    ) -> anyhow::Result<Vec<Self::Event>>;
}
