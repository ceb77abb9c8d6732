//! Direct-address branch redirection.
//!
//! The patch site must already be a 5-byte `call rel32` (`E8`) or
//! `jmp rel32` (`E9`). Its old target is the original routine; the
//! displacement is rewritten to reach an absolute-jump stub in the
//! trampoline, which in turn jumps to the wrapper. No instructions are
//! relocated, so the original stays callable as-is.

use crate::trampoline::Trampoline;
use crate::writer::PatchWriter;
use crate::{Error, Result, fn_addr, fn_from_addr};
use std::ptr;

const BRANCH_LEN: usize = 5;
const OP_CALL: u8 = 0xE8;
const OP_JMP: u8 = 0xE9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Call,
    Jump,
}

/// A rewritten branch and the routine it used to reach.
#[derive(Debug)]
pub struct BranchHook<F> {
    stub: usize,
    kind: BranchKind,
    displaced: [u8; BRANCH_LEN],
    original: F,
}

impl<F: Copy> BranchHook<F> {
    /// Redirect the branch at `site` to `wrapper`.
    ///
    /// # Safety
    /// `site` must be the address of a rel32 branch instruction in mapped
    /// code whose target has signature `F`.
    pub unsafe fn install<W: PatchWriter>(
        writer: &W,
        trampoline: &mut Trampoline,
        site: usize,
        wrapper: F,
    ) -> Result<Self> {
        // SAFETY: forwarded caller contract.
        let (kind, displaced, original) = unsafe { decode(site)? };
        let next = site.wrapping_add(BRANCH_LEN);

        let stub = trampoline.write(&absolute_jump(fn_addr(wrapper)))?;
        let new_disp = rel32(next, stub)?;

        let mut patch = displaced;
        patch[1..].copy_from_slice(&new_disp.to_le_bytes());
        // SAFETY: same mapped range that was just read; the writer handles
        // protection.
        unsafe { writer.write(site, &patch)? };

        Ok(Self {
            stub,
            kind,
            displaced,
            // SAFETY: the branch targeted an `F` routine per the contract.
            original: unsafe { fn_from_addr(original) },
        })
    }

    /// The routine the branch at `site` reaches right now, without patching
    /// anything.
    ///
    /// # Safety
    /// As for [`BranchHook::install`].
    pub unsafe fn current_target(site: usize) -> Result<F> {
        // SAFETY: forwarded caller contract.
        let (_, _, target) = unsafe { decode(site)? };
        // SAFETY: the branch targets an `F` routine per the contract.
        Ok(unsafe { fn_from_addr(target) })
    }

    /// The routine the branch reached before installation.
    pub fn original(&self) -> F {
        self.original
    }

    /// Address of the stub in the trampoline.
    pub fn stub(&self) -> usize {
        self.stub
    }

    pub fn kind(&self) -> BranchKind {
        self.kind
    }

    /// The instruction bytes that were overwritten.
    pub fn displaced(&self) -> [u8; BRANCH_LEN] {
        self.displaced
    }
}

/// Kind, raw bytes and absolute target of the rel32 branch at `site`.
///
/// # Safety
/// `site` must be null or point at five readable bytes.
unsafe fn decode(site: usize) -> Result<(BranchKind, [u8; BRANCH_LEN], usize)> {
    if site == 0 {
        return Err(Error::NullSite);
    }
    // SAFETY: the caller guarantees `site` points at mapped code.
    let bytes: [u8; BRANCH_LEN] = unsafe { ptr::read_unaligned(site as *const _) };
    let kind = match bytes[0] {
        OP_CALL => BranchKind::Call,
        OP_JMP => BranchKind::Jump,
        opcode => return Err(Error::UnexpectedOpcode { site, opcode }),
    };
    let disp = i32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    let target = site.wrapping_add(BRANCH_LEN).wrapping_add_signed(disp as isize);
    Ok((kind, bytes, target))
}

/// `jmp qword ptr [rip+0]` followed by the 64-bit target.
fn absolute_jump(target: usize) -> [u8; 14] {
    let mut stub = [0u8; 14];
    stub[..6].copy_from_slice(&[0xFF, 0x25, 0x00, 0x00, 0x00, 0x00]);
    stub[6..].copy_from_slice(&(target as u64).to_le_bytes());
    stub
}

/// Displacement from the end of a branch at `next` to `target`.
fn rel32(next: usize, target: usize) -> Result<i32> {
    let delta = (target as i128) - (next as i128);
    i32::try_from(delta).map_err(|_| Error::OutOfRange { from: next, target })
}
