//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";

// Entity identifiers
pub const FIELD_ENTITY_ID: &str = "entity_id";
pub const FIELD_RULE: &str = "rule";

// Collection sizes
pub const FIELD_CHANGED_LEN: &str = "changed_len";
pub const FIELD_ATTRIBUTIONS_LEN: &str = "attributions_len";
pub const FIELD_ANOMALIES_LEN: &str = "anomalies_len";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_RULE_FIRED: &str = "rule_fired";
pub const EVENT_FALLBACK: &str = "fallback";
pub const EVENT_ANOMALY: &str = "anomaly";
