//! Ownership of the trampoline and of every patched address.

use crate::branch::BranchHook;
use crate::trampoline::Trampoline;
use crate::vtable::{VfuncHook, slot_address};
use crate::writer::{PatchWriter, ProtectedWriter};
use crate::{Error, Result};
use std::collections::HashSet;

/// Installs hooks, at most once per slot or site.
#[derive(Debug)]
pub struct HookManager<W = ProtectedWriter> {
    writer: W,
    trampoline: Option<Trampoline>,
    patched: HashSet<usize>,
}

impl HookManager {
    pub fn new() -> Self {
        Self::with_writer(ProtectedWriter)
    }
}

impl Default for HookManager {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: PatchWriter> HookManager<W> {
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            trampoline: None,
            patched: HashSet::new(),
        }
    }

    /// Allocate the trampoline branch hooks need. A no-op if one exists.
    pub fn reserve_trampoline(&mut self, size: usize, near: usize) -> Result<()> {
        if self.trampoline.is_none() {
            self.trampoline = Some(Trampoline::allocate(size, near)?);
        }
        Ok(())
    }

    /// Use a trampoline the caller already owns.
    pub fn set_trampoline(&mut self, trampoline: Trampoline) {
        self.trampoline = Some(trampoline);
    }

    pub fn trampoline(&self) -> Option<&Trampoline> {
        self.trampoline.as_ref()
    }

    /// Number of slots and sites patched so far.
    pub fn patched(&self) -> usize {
        self.patched.len()
    }

    /// Redirect slot `index` of `table` to `wrapper`.
    ///
    /// # Safety
    /// See [`VfuncHook::install`].
    pub unsafe fn install_vfunc<F: Copy>(
        &mut self,
        name: &str,
        table: usize,
        index: usize,
        wrapper: F,
    ) -> Result<VfuncHook<F>> {
        let slot = slot_address(table, index);
        if table != 0 && self.patched.contains(&slot) {
            return Err(Error::AlreadyInstalled { addr: slot });
        }
        // SAFETY: forwarded caller contract.
        let hook = unsafe { VfuncHook::install(&self.writer, table, index, wrapper)? };
        self.patched.insert(slot);
        tracing::info!(
            hook = name,
            slot = format_args!("{slot:#x}"),
            index,
            "redirected dispatch slot"
        );
        Ok(hook)
    }

    /// Redirect the rel32 branch at `site` to `wrapper`.
    ///
    /// # Safety
    /// See [`BranchHook::install`].
    pub unsafe fn install_branch<F: Copy>(
        &mut self,
        name: &str,
        site: usize,
        wrapper: F,
    ) -> Result<BranchHook<F>> {
        if self.patched.contains(&site) {
            return Err(Error::AlreadyInstalled { addr: site });
        }
        let trampoline = self.trampoline.as_mut().ok_or(Error::NoTrampoline)?;
        // SAFETY: forwarded caller contract.
        let hook = unsafe { BranchHook::install(&self.writer, trampoline, site, wrapper)? };
        self.patched.insert(site);
        tracing::info!(
            hook = name,
            site = format_args!("{site:#x}"),
            stub = format_args!("{:#x}", hook.stub()),
            "redirected branch"
        );
        Ok(hook)
    }
}
