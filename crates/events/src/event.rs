use chrono::{DateTime, Utc};

use storefront_core::AggregateId;

/// A committed change to one record, ready for publication.
///
/// Every event names the record family it belongs to (`AGGREGATE_TYPE`) and
/// the record it is about, so an envelope can be built from the event alone.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Record family, e.g. `"kits.kit"`.
    const AGGREGATE_TYPE: &'static str;

    /// Stable event name, e.g. `"kits.stock.changed"`.
    fn event_type(&self) -> &'static str;

    fn aggregate_id(&self) -> AggregateId;

    fn occurred_at(&self) -> DateTime<Utc>;

    /// Payload schema version. Bump when a payload field changes meaning.
    fn version(&self) -> u32 {
        1
    }
}
