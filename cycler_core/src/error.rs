use thiserror::Error;

/// Why a reporting interval (and its phase) unwound early. Recoverable: the
/// cycle driver decides whether to resume, switch, or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Measured current under the sense floor: cell removed mid-run.
    OpenCircuit,
    /// Operator requested a manual phase switch.
    OperatorToggle,
    /// Process shutdown (ctrl-c) requested.
    Shutdown,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::OpenCircuit => write!(f, "open circuit"),
            AbortReason::OperatorToggle => write!(f, "operator toggle"),
            AbortReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum CyclerError {
    #[error("link error: {0}")]
    Link(String),
    #[error("link fault: {0}")]
    LinkFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("timeout waiting for instrument")]
    Timeout,
    #[error("invalid state: {0}")]
    State(String),
    #[error("aborted: {0}")]
    Abort(AbortReason),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing instrument link")]
    MissingInstrument,
    #[error("missing operator keys")]
    MissingKeys,
    #[error("missing cell parameters")]
    MissingCell,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
