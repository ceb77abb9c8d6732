//! Hook installation errors.

use thiserror::Error;

/// Hook installation errors.
///
/// None of these are fatal to the host: a failed installation only means the
/// corresponding protection is not enforced.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("dispatch table address is null")]
    NullTable,

    #[error("slot {index} of dispatch table {table:#x} is empty")]
    EmptySlot { table: usize, index: usize },

    #[error("{addr:#x} is already redirected")]
    AlreadyInstalled { addr: usize },

    #[error("patch site address is null")]
    NullSite,

    #[error("unexpected opcode {opcode:#04x} at {site:#x}, expected a rel32 call or jmp")]
    UnexpectedOpcode { site: usize, opcode: u8 },

    #[error("no trampoline reserved")]
    NoTrampoline,

    #[error("failed to allocate trampoline: {0}")]
    TrampolineAlloc(#[source] std::io::Error),

    #[error("trampoline exhausted: need {needed} bytes, {available} left")]
    TrampolineFull { needed: usize, available: usize },

    #[error("{target:#x} is out of rel32 range from {from:#x}")]
    OutOfRange { from: usize, target: usize },

    #[error("failed to change page protection at {addr:#x}: {source}")]
    Protect {
        addr: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("unrecognized build variant '{0}'")]
    UnknownBuild(String),

    #[error("address id {0} not found in address library")]
    UnknownAddress(u64),
}

pub type Result<T> = std::result::Result<T, Error>;
