//! Versioned identifier → address lookup.
//!
//! Code that is not reached through a dispatch table has no stable offset
//! across host builds. It is named by an id per build variant instead, and
//! the id is looked up in the address library shipped for the running build.

use crate::{Error, Result};
use std::collections::HashMap;
use std::str::FromStr;

/// Looks up an address library id.
pub trait AddressResolver {
    /// Absolute address for `id`, or `None` if the library lacks it.
    fn resolve(&self, id: u64) -> Option<usize>;
}

/// Host build families with distinct address libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildVariant {
    OldGen,
    NextGen,
}

impl FromStr for BuildVariant {
    type Err = Error;

    /// Unrecognised discriminators are an error; patching with another
    /// build's id would corrupt unrelated code.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "og" | "old-gen" | "oldgen" => Ok(Self::OldGen),
            "ng" | "next-gen" | "nextgen" => Ok(Self::NextGen),
            _ => Err(Error::UnknownBuild(s.to_string())),
        }
    }
}

impl std::fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OldGen => f.write_str("old-gen"),
            Self::NextGen => f.write_str("next-gen"),
        }
    }
}

/// One address library id per build variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressId {
    pub old_gen: u64,
    pub next_gen: u64,
}

impl AddressId {
    pub const fn new(old_gen: u64, next_gen: u64) -> Self {
        Self { old_gen, next_gen }
    }

    pub fn for_variant(&self, variant: BuildVariant) -> u64 {
        match variant {
            BuildVariant::OldGen => self.old_gen,
            BuildVariant::NextGen => self.next_gen,
        }
    }
}

/// A patch site: a function id plus the offset of the instruction in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub id: AddressId,
    pub offset: usize,
}

impl CallSite {
    pub const fn new(id: AddressId, offset: usize) -> Self {
        Self { id, offset }
    }

    /// Absolute address of the site for the build named by `discriminator`.
    pub fn resolve(&self, resolver: &dyn AddressResolver, discriminator: &str) -> Result<usize> {
        let variant: BuildVariant = discriminator.parse()?;
        let id = self.id.for_variant(variant);
        let site = resolver
            .resolve(id)
            .and_then(|function| function.checked_add(self.offset))
            .ok_or(Error::UnknownAddress(id))?;
        tracing::debug!(%variant, id, "resolved call site");
        Ok(site)
    }
}

/// In-memory address library: id → offset from the module base.
#[derive(Debug, Clone, Default)]
pub struct AddressTable {
    base: usize,
    offsets: HashMap<u64, usize>,
}

impl AddressTable {
    pub fn with_entries(base: usize, entries: impl IntoIterator<Item = (u64, usize)>) -> Self {
        Self {
            base,
            offsets: entries.into_iter().collect(),
        }
    }
}

impl AddressResolver for AddressTable {
    fn resolve(&self, id: u64) -> Option<usize> {
        self.offsets
            .get(&id)
            .and_then(|offset| self.base.checked_add(*offset))
    }
}
