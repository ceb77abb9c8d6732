use crate::HookSite;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("plugin already loaded")]
    AlreadyLoaded,

    #[error("host does not expose the {0} dispatch table")]
    MissingTable(HookSite),

    #[error("host does not name a {0} call site")]
    MissingCallSite(HookSite),

    #[error("host does not expose an address library")]
    MissingAddressLibrary,

    #[error("failed to start logging: {0}")]
    Logging(String),

    #[error(transparent)]
    Hook(#[from] hooks::Error),

    #[error(transparent)]
    Policy(#[from] policy::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
