use strata_protos::common::{AppStatusPb, StatusCodePb};

pub type Result<T> = std::result::Result<T, Error>;

/// Status of a failed client operation.
///
/// A status is a code plus a human-readable message; it is cheap to clone
/// and survives a round trip through the wire `AppStatusPb` with the same
/// code and message, so server-side failures are surfaced to callers
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out: {0}")]
    TimedOut(String),

    #[error("Already present: {0}")]
    AlreadyPresent(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Aborted: {0}")]
    Aborted(String),

    #[error("Corruption: {0}")]
    Corruption(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Error::TimedOut(_))
    }

    pub fn is_already_present(&self) -> bool {
        matches!(self, Error::AlreadyPresent(_))
    }

    /// True for failures of the transport rather than of the operation.
    pub fn is_network_error(&self) -> bool {
        matches!(self, Error::NetworkError(_) | Error::ServiceUnavailable(_))
    }

    pub fn code(&self) -> StatusCodePb {
        match self {
            Error::InvalidArgument(_) => StatusCodePb::InvalidArgument,
            Error::IllegalState(_) => StatusCodePb::IllegalState,
            Error::NotFound(_) => StatusCodePb::NotFound,
            Error::TimedOut(_) => StatusCodePb::TimedOut,
            Error::AlreadyPresent(_) => StatusCodePb::AlreadyPresent,
            Error::ServiceUnavailable(_) => StatusCodePb::ServiceUnavailable,
            Error::Aborted(_) => StatusCodePb::Aborted,
            Error::Corruption(_) => StatusCodePb::Corruption,
            Error::NetworkError(_) => StatusCodePb::NetworkError,
            Error::RuntimeError(_) => StatusCodePb::RuntimeError,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::InvalidArgument(m)
            | Error::IllegalState(m)
            | Error::NotFound(m)
            | Error::TimedOut(m)
            | Error::AlreadyPresent(m)
            | Error::ServiceUnavailable(m)
            | Error::Aborted(m)
            | Error::Corruption(m)
            | Error::NetworkError(m)
            | Error::RuntimeError(m) => m,
        }
    }

    pub fn to_app_status(&self) -> AppStatusPb {
        AppStatusPb {
            code: self.code() as i32,
            message: self.message().to_string(),
        }
    }
}

impl From<AppStatusPb> for Error {
    fn from(pb: AppStatusPb) -> Error {
        let message = pb.message;
        match StatusCodePb::try_from(pb.code).unwrap_or(StatusCodePb::UnknownError) {
            StatusCodePb::InvalidArgument => Error::InvalidArgument(message),
            StatusCodePb::IllegalState => Error::IllegalState(message),
            StatusCodePb::NotFound => Error::NotFound(message),
            StatusCodePb::TimedOut => Error::TimedOut(message),
            StatusCodePb::AlreadyPresent => Error::AlreadyPresent(message),
            StatusCodePb::ServiceUnavailable => Error::ServiceUnavailable(message),
            StatusCodePb::Aborted => Error::Aborted(message),
            StatusCodePb::Corruption => Error::Corruption(message),
            StatusCodePb::NetworkError => Error::NetworkError(message),
            StatusCodePb::Ok | StatusCodePb::UnknownError | StatusCodePb::RuntimeError => {
                Error::RuntimeError(message)
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::NetworkError(e.to_string())
    }
}

impl From<prost::DecodeError> for Error {
    fn from(e: prost::DecodeError) -> Error {
        Error::Corruption(e.to_string())
    }
}
