use thiserror::Error;

/// Result type alias using ChangeFinderError
pub type Result<T> = std::result::Result<T, ChangeFinderError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Stable classification of every error the engine can raise. Each kind maps
/// to a stable error code used in structured logs and at the CLI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Attribution invariants
    /// A reference lookup returned more than one record where at most one was expected
    AmbiguousReferenceMatch,
    /// A rule claimed a field that was not in the remaining changed set
    ClaimViolation,
    /// A rule yielded an attribution with no claimed fields
    EmptyClaim,
    /// A snapshot arrived with an earlier `valid_from` than its stored predecessor
    OutOfOrderSnapshot,

    // Input/configuration
    InvalidSnapshot,
    InvalidCatalogue,

    // Integration/IO
    Io,
    Serialization,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::AmbiguousReferenceMatch => "ERR_AMBIGUOUS_REFERENCE_MATCH",
            ExErrorKind::ClaimViolation => "ERR_CLAIM_VIOLATION",
            ExErrorKind::EmptyClaim => "ERR_EMPTY_CLAIM",
            ExErrorKind::OutOfOrderSnapshot => "ERR_OUT_OF_ORDER_SNAPSHOT",
            ExErrorKind::InvalidSnapshot => "ERR_INVALID_SNAPSHOT",
            ExErrorKind::InvalidCatalogue => "ERR_INVALID_CATALOGUE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
        }
    }

    /// Whether an error of this kind breaks an engine invariant.
    ///
    /// Fatal kinds abort processing of the current snapshot.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            ExErrorKind::AmbiguousReferenceMatch
                | ExErrorKind::ClaimViolation
                | ExErrorKind::EmptyClaim
                | ExErrorKind::OutOfOrderSnapshot
        )
    }
}

/// Canonical structured error type
///
/// Carries the classification plus operation/entity/rule context for
/// programmatic handling and log output.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    rule: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            rule: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add rule name context
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the rule context, if any
    pub fn rule(&self) -> Option<&str> {
        self.rule.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(rule) = &self.rule {
            write!(f, " (rule: {})", rule)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for attribution operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChangeFinderError {
    // ===== Engine invariants =====
    /// A reference lookup matched more records than the rule can explain
    #[error("Ambiguous reference match in {rule}: {matches} records in table {table} for entity {entity_id}")]
    AmbiguousReferenceMatch {
        rule: String,
        table: String,
        entity_id: String,
        matches: usize,
    },

    /// A rule claimed a field that is not in the remaining changed set
    #[error("Claim violation: rule {rule} claimed field {field} which is not in the remaining set")]
    ClaimViolation { rule: String, field: String },

    /// A rule yielded an attribution without any claimed fields
    #[error("Rule {rule} yielded an attribution with no claimed fields")]
    EmptyClaim { rule: String },

    /// Snapshot arrived before its predecessor
    #[error("Snapshot for {entity_id} at {current} precedes its predecessor at {previous}")]
    OutOfOrderSnapshot {
        entity_id: String,
        previous: String,
        current: String,
    },

    // ===== Input/configuration =====
    /// Ingested record is not a usable snapshot
    #[error("Invalid snapshot: {reason}")]
    InvalidSnapshot { reason: String },

    /// Rule catalogue configuration failed validation
    #[error("Invalid catalogue: {reason}")]
    InvalidCatalogue { reason: String },

    // ===== Generic Errors =====
    /// Serialization error (JSON/YAML encoding or decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl ChangeFinderError {
    /// Canonical kind of this error
    pub fn kind(&self) -> ExErrorKind {
        match self {
            ChangeFinderError::AmbiguousReferenceMatch { .. } => {
                ExErrorKind::AmbiguousReferenceMatch
            }
            ChangeFinderError::ClaimViolation { .. } => ExErrorKind::ClaimViolation,
            ChangeFinderError::EmptyClaim { .. } => ExErrorKind::EmptyClaim,
            ChangeFinderError::OutOfOrderSnapshot { .. } => ExErrorKind::OutOfOrderSnapshot,
            ChangeFinderError::InvalidSnapshot { .. } => ExErrorKind::InvalidSnapshot,
            ChangeFinderError::InvalidCatalogue { .. } => ExErrorKind::InvalidCatalogue,
            ChangeFinderError::Serialization { .. } => ExErrorKind::Serialization,
        }
    }
}

impl From<serde_json::Error> for ChangeFinderError {
    fn from(err: serde_json::Error) -> Self {
        ChangeFinderError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for ChangeFinderError {
    fn from(err: serde_yaml::Error) -> Self {
        ChangeFinderError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Conversion from ChangeFinderError to ExError
///
/// Keeps the structured context (entity, rule) on the canonical error so
/// that `log_op_error!` and the CLI can report it uniformly.
impl From<ChangeFinderError> for ExError {
    fn from(err: ChangeFinderError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        let base = ExError::new(kind).with_message(message);
        match err {
            ChangeFinderError::AmbiguousReferenceMatch {
                rule, entity_id, ..
            } => base
                .with_op("reference_lookup")
                .with_rule(rule)
                .with_entity_id(entity_id),
            ChangeFinderError::ClaimViolation { rule, .. }
            | ChangeFinderError::EmptyClaim { rule } => base.with_op("claim").with_rule(rule),
            ChangeFinderError::OutOfOrderSnapshot { entity_id, .. } => {
                base.with_op("process").with_entity_id(entity_id)
            }
            ChangeFinderError::InvalidSnapshot { .. } => base.with_op("parse_snapshot"),
            ChangeFinderError::InvalidCatalogue { .. } => base.with_op("load_catalogue"),
            ChangeFinderError::Serialization { .. } => base,
        }
    }
}
