pub mod attribution;
pub mod change;
pub mod snapshot;

pub use attribution::{Anomaly, AnomalyKind, Attribution, AttributionKind, Provenance};
pub use change::Change;
pub use snapshot::{EntityId, FieldName, Fields, Snapshot};
