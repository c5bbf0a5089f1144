use std::error::Error as StdError;
use std::fmt;

type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

/// Failure to retrieve one page.
///
/// `cause` carries the last underlying error: the transport error for a
/// single attempt, or the final attempt's [`FetchError`] once retries ran out.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
    #[source]
    pub cause: Option<BoxedCause>,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Kind of the innermost chained [`FetchError`], or this one's kind.
    pub fn last_kind(&self) -> &FailureKind {
        self.cause
            .as_deref()
            .and_then(|cause| cause.downcast_ref::<FetchError>())
            .map(FetchError::last_kind)
            .unwrap_or(&self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
    RetriesExhausted { attempts: u32 },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
            FailureKind::RetriesExhausted { attempts } => {
                write!(f, "gave up after {attempts} attempts")
            }
        }
    }
}

/// Which side of a game a boxscore table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Visitors,
    Home,
}

impl Role {
    /// Page order of the two boxscore tables.
    pub const ALL: [Role; 2] = [Role::Visitors, Role::Home];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Visitors => "Visitors",
            Role::Home => "Home",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
