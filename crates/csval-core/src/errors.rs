use thiserror::Error;

/// Result type alias using CsvalError
pub type Result<T> = std::result::Result<T, CsvalError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Only programming-level and setup failures live here. Problems with the
/// validated object itself are diagnostics, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Constraint tree construction
    InvalidTree,
    NotFound,

    // Configuration
    InvalidConfig,
    Io,
    Serialization,

    // Post-solve invariant
    ConsistencyFault,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidTree => "ERR_INVALID_TREE",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::ConsistencyFault => "ERR_CONSISTENCY_FAULT",
        }
    }

    /// Whether this kind signals a defect in the validator itself
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExErrorKind::ConsistencyFault)
    }
}

/// Canonical structured error type
///
/// Carries a classification plus optional rule/field context for
/// programmatic handling and log emission.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    rule: Option<String>,
    field: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            rule: None,
            field: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add grammar rule context
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Add structural field context
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
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

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn rule(&self) -> Option<&str> {
        self.rule.as_deref()
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

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
        if let Some(rule) = &self.rule {
            write!(f, " (rule: {})", rule)?;
        }
        if let Some(field) = &self.field {
            write!(f, " (field: {})", field)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for csval operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CsvalError {
    // ===== Constraint Tree Errors =====
    /// A tree was built without a root node
    #[error("Rule {rule} has no root constraint node")]
    MissingRoot { rule: String },

    /// A second root was added to a tree
    #[error("Rule {rule} already has a root constraint node")]
    DuplicateRoot { rule: String },

    /// A node id does not belong to the tree
    #[error("Rule {rule} has no constraint node {node}")]
    UnknownNode { rule: String, node: usize },

    /// Assignments and actions cannot contain children
    #[error("Constraint node {node} of rule {rule} is a {kind} and cannot contain children")]
    LeafCannotContain {
        rule: String,
        node: usize,
        kind: &'static str,
    },

    /// An assignment was declared without a target field
    #[error("Assignment in rule {rule} has an empty target field")]
    EmptyFieldName { rule: String },

    // ===== Configuration Errors =====
    #[error("Invalid heuristic configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Failed to parse heuristic configuration: {message}")]
    ConfigParse { message: String },

    #[error("Failed to read heuristic configuration: {message}")]
    ConfigIo { message: String },

    // ===== Distribution Errors =====
    /// Post-solve invariant: assignment quantities of a field must add up to its count
    #[error("Rule {rule}, field {field}: assignment quantities sum to {found}, but {expected} expected")]
    ConsistencyFault {
        rule: String,
        field: String,
        expected: usize,
        found: usize,
    },
}

impl CsvalError {
    /// Whether the error reports a defect in the validator rather than bad setup
    pub fn is_fatal(&self) -> bool {
        matches!(self, CsvalError::ConsistencyFault { .. })
    }
}

impl From<CsvalError> for ExError {
    fn from(err: CsvalError) -> Self {
        let message = err.to_string();
        match err {
            CsvalError::MissingRoot { rule }
            | CsvalError::DuplicateRoot { rule }
            | CsvalError::LeafCannotContain { rule, .. }
            | CsvalError::EmptyFieldName { rule } => ExError::new(ExErrorKind::InvalidTree)
                .with_rule(rule)
                .with_message(message),

            CsvalError::UnknownNode { rule, .. } => ExError::new(ExErrorKind::NotFound)
                .with_rule(rule)
                .with_message(message),

            CsvalError::InvalidConfig { .. } => {
                ExError::new(ExErrorKind::InvalidConfig).with_message(message)
            }

            CsvalError::ConfigParse { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            CsvalError::ConfigIo { .. } => ExError::new(ExErrorKind::Io).with_message(message),

            CsvalError::ConsistencyFault { rule, field, .. } => {
                ExError::new(ExErrorKind::ConsistencyFault)
                    .with_rule(rule)
                    .with_field(field)
                    .with_message(message)
            }
        }
    }
}

impl From<toml::de::Error> for CsvalError {
    fn from(err: toml::de::Error) -> Self {
        CsvalError::ConfigParse {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for CsvalError {
    fn from(err: std::io::Error) -> Self {
        CsvalError::ConfigIo {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (ExErrorKind::InvalidTree, "ERR_INVALID_TREE"),
            (ExErrorKind::NotFound, "ERR_NOT_FOUND"),
            (ExErrorKind::InvalidConfig, "ERR_INVALID_CONFIG"),
            (ExErrorKind::ConsistencyFault, "ERR_CONSISTENCY_FAULT"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_consistency_fault_is_fatal() {
        let err = CsvalError::ConsistencyFault {
            rule: "Model".to_string(),
            field: "elements".to_string(),
            expected: 3,
            found: 2,
        };
        assert!(err.is_fatal());

        let ex: ExError = err.into();
        assert_eq!(ex.kind(), ExErrorKind::ConsistencyFault);
        assert_eq!(ex.rule(), Some("Model"));
        assert_eq!(ex.field(), Some("elements"));
        assert!(ex.kind().is_fatal());
    }

    #[test]
    fn test_tree_errors_are_not_fatal() {
        let err = CsvalError::DuplicateRoot {
            rule: "Model".to_string(),
        };
        assert!(!err.is_fatal());
        let ex: ExError = err.into();
        assert_eq!(ex.code(), "ERR_INVALID_TREE");
        assert!(ex.to_string().contains("(rule: Model)"));
    }
}
