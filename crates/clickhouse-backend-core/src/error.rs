// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Error types shared by every layer of the backend.
//!
//! # Overview
//!
//! | Category | Variants | Raised |
//! |----------|----------|--------|
//! | Configuration | [`Error::Config`] | While building models, settings or EXPLAIN options |
//! | Validation | [`Error::Validation`] | Before a value reaches the wire |
//! | Dialect | [`Error::Field`], [`Error::NotSupported`], [`Error::UnsupportedEngineForIndex`] | During compilation |
//! | Runtime | [`Error::Database`], [`Error::Interface`], [`Error::TooManyConnections`] | While executing |
//! | Migration | [`Error::Migration`] | While applying or unapplying migrations |
//!
//! Driver errors are expressed through [`DatabaseError`] and keep the original
//! server message untouched.

use thiserror::Error;

/// Result alias used across the backend crates.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Classification of server-side failures.
///
/// Mirrors the classic DB-API exception tree below `DatabaseError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseErrorKind {
    /// Bad data: out of range, cannot parse, wrong type.
    Data,
    /// Network errors, timeouts, unexpected disconnects.
    Operational,
    /// Relational integrity violations.
    Integrity,
    /// Internal server errors.
    Internal,
    /// Syntax errors, unknown tables or columns.
    Programming,
    /// The server does not support the requested operation.
    NotSupported
}

impl DatabaseErrorKind {
    /// Name of the kind as it appears in log records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "DataError",
            Self::Operational => "OperationalError",
            Self::Integrity => "IntegrityError",
            Self::Internal => "InternalError",
            Self::Programming => "ProgrammingError",
            Self::NotSupported => "NotSupportedError"
        }
    }
}

/// Error reported by a driver or the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DatabaseError {
    /// Kind of the failure.
    pub kind:    DatabaseErrorKind,
    /// Server exception code, when the server sent one.
    pub code:    Option<i32>,
    /// Original message.
    pub message: String
}

impl DatabaseError {
    /// Create an error of the given kind.
    pub fn new(kind: DatabaseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into()
        }
    }

    /// Attach a server exception code.
    #[must_use]
    pub const fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    /// Shortcut for [`DatabaseErrorKind::Operational`].
    pub fn operational(message: impl Into<String>) -> Self {
        Self::new(DatabaseErrorKind::Operational, message)
    }

    /// Shortcut for [`DatabaseErrorKind::Programming`].
    pub fn programming(message: impl Into<String>) -> Self {
        Self::new(DatabaseErrorKind::Programming, message)
    }
}

/// Value rejected before it reaches the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Integer outside the range of the target column type.
    #[error("{value} is out of range for {db_type} [{min}, {max}]")]
    OutOfRange {
        /// Column type.
        db_type: String,
        /// Offending value.
        value:   String,
        /// Lower bound.
        min:     String,
        /// Upper bound.
        max:     String
    },

    /// Value longer than the fixed width of the column.
    #[error("value is {len} bytes long, {db_type} holds at most {max}")]
    TooLong {
        /// Column type.
        db_type: String,
        /// Length of the value in bytes.
        len:     usize,
        /// Maximum length in bytes.
        max:     usize
    },

    /// Enum value that is not among the declared choices.
    #[error("{value} is not a valid choice")]
    InvalidChoice {
        /// Offending value.
        value: String
    },

    /// Tuple value with the wrong arity.
    #[error("tuple has {got} elements, expected {expected}")]
    TupleLength {
        /// Arity of the column type.
        expected: usize,
        /// Arity of the value.
        got:      usize
    },

    /// Text that does not parse as an address of the required protocol.
    #[error("{value} is not a valid {protocol} address")]
    InvalidIp {
        /// Offending value.
        value:    String,
        /// Expected protocol.
        protocol: &'static str
    },

    /// Map key outside the key domain of the column.
    #[error("invalid map key: {0}")]
    MapKey(String),

    /// Decimal with too many digits.
    #[error("{value} does not fit {db_type}")]
    Precision {
        /// Column type.
        db_type: String,
        /// Offending value.
        value:   String
    },

    /// Null written into a non-nullable column.
    #[error("null is not allowed in {db_type}")]
    NullNotAllowed {
        /// Column type.
        db_type: String
    },

    /// Value of a shape the column cannot hold.
    #[error("{value} is not a valid {db_type} value")]
    InvalidType {
        /// Column type.
        db_type: String,
        /// Offending value.
        value:   String
    }
}

/// Error type of the backend.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid field, model, engine, index, setting or EXPLAIN option.
    #[error("configuration error: {0}")]
    Config(String),

    /// Value rejected by a field validator.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unknown lookup, unresolvable name or illegal expression.
    #[error("field error: {0}")]
    Field(String),

    /// Construct that ClickHouse cannot express.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Skip-index requested on an engine outside the MergeTree family.
    #[error("index {index} on {table} requires a MergeTree family engine, got {engine}")]
    UnsupportedEngineForIndex {
        /// Table name.
        table:  String,
        /// Index name.
        index:  String,
        /// Engine name.
        engine: String
    },

    /// Pool saturated.
    #[error("too many connections: pool limit of {max} reached")]
    TooManyConnections {
        /// Configured maximum.
        max: usize
    },

    /// Misuse of the driver interface.
    #[error("interface error: {0}")]
    Interface(String),

    /// Failure reported by the driver or the server.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Migration ledger or operation failure.
    #[error("migration error: {0}")]
    Migration(String),

    /// Non-fatal condition escalated by the caller.
    #[error("warning: {0}")]
    Warning(String)
}

impl Error {
    /// Build a [`Error::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Build a [`Error::Field`].
    pub fn field(message: impl Into<String>) -> Self {
        Self::Field(message.into())
    }

    /// Build a [`Error::NotSupported`].
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported(message.into())
    }

    /// Build a [`Error::Interface`].
    pub fn interface(message: impl Into<String>) -> Self {
        Self::Interface(message.into())
    }

    /// Build a [`Error::Migration`].
    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration(message.into())
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error was raised by the dialect during compilation.
    #[must_use]
    pub const fn is_dialect(&self) -> bool {
        matches!(
            self,
            Self::Field(_) | Self::NotSupported(_) | Self::UnsupportedEngineForIndex { .. }
        )
    }

    /// Check if this error came from executing a statement.
    #[must_use]
    pub const fn is_runtime(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Interface(_) | Self::TooManyConnections { .. }
        )
    }

    /// Database error kind, when this wraps a [`DatabaseError`].
    #[must_use]
    pub const fn database_kind(&self) -> Option<DatabaseErrorKind> {
        match self {
            Self::Database(e) => Some(e.kind),
            _ => None
        }
    }
}
