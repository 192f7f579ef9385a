//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Validation subjects
pub const FIELD_RULE: &str = "rule";
pub const FIELD_OBJECT_TYPE: &str = "object_type";
pub const FIELD_FIELD: &str = "field";

// Collection sizes and outcomes
pub const FIELD_RULE_COUNT: &str = "rule_count";
pub const FIELD_DIAGNOSTIC_COUNT: &str = "diagnostic_count";
pub const FIELD_VALID: &str = "valid";

// Heuristic search
pub const FIELD_MAX_TRIES: &str = "max_tries";
pub const FIELD_TRIES: &str = "tries";
pub const FIELD_QUALITY: &str = "quality";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_SOLVED: &str = "solved";
