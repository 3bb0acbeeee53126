use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("conflict: {message}")]
    Conflict {
        message: String,
    },

    #[error("forbidden: {message}")]
    Forbidden {
        message: String,
    },

    #[error("{entity} not found: {key}")]
    NotFound {
        entity: &'static str,
        key: String,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },
}

/// response class an error maps to at the request boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Forbidden,
    NotFound,
    Storage,
}

impl ErrorKind {
    /// http-style status code for the class
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Conflict => 409,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Storage => 500,
        }
    }
}

impl BillingError {
    pub fn validation(message: impl Into<String>) -> Self {
        BillingError::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        BillingError::Conflict {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        BillingError::Forbidden {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        BillingError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        BillingError::Storage {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BillingError::Validation { .. } => ErrorKind::Validation,
            BillingError::Conflict { .. } => ErrorKind::Conflict,
            BillingError::Forbidden { .. } => ErrorKind::Forbidden,
            BillingError::NotFound { .. } => ErrorKind::NotFound,
            BillingError::Storage { .. } => ErrorKind::Storage,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BillingError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;

/// absorb a not-found from a secondary lookup, replacing it with `default`
pub(crate) fn or_absent<T>(result: Result<T>, default: T) -> Result<T> {
    match result {
        Err(err) if err.is_not_found() => Ok(default),
        other => other,
    }
}
