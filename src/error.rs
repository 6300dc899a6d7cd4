use thiserror::Error;

/// Errors surfaced by the message lifecycle layer.
#[derive(Debug, Error)]
pub enum Error {
    /// The manager was built without a rendering primitive.
    #[error("no message renderer was provided")]
    MissingRenderer,

    /// The background timer thread could not be started.
    #[error("failed to start the timer thread: {0}")]
    SchedulerSpawn(#[source] std::io::Error),

    /// `global::try_global` was called before a manager was installed.
    #[error("the global message manager has not been installed")]
    NotInstalled,

    /// A message kind string did not match any known severity.
    #[error("unknown message kind '{0}'")]
    UnknownKind(String),
}

pub type Result<T> = std::result::Result<T, Error>;
