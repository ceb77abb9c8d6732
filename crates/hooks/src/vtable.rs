//! Dispatch-table slot redirection.

use crate::writer::PatchWriter;
use crate::{Error, Result, fn_addr, fn_from_addr};
use std::mem::size_of;
use std::ptr;

/// One redirected dispatch-table slot and the entry point it used to hold.
#[derive(Debug)]
pub struct VfuncHook<F> {
    table: usize,
    index: usize,
    original: F,
}

impl<F: Copy> VfuncHook<F> {
    /// Point slot `index` of `table` at `wrapper`.
    ///
    /// # Safety
    /// `table` must be the address of a live dispatch table with more than
    /// `index` slots, and slot `index` must have signature `F`.
    pub unsafe fn install<W: PatchWriter>(
        writer: &W,
        table: usize,
        index: usize,
        wrapper: F,
    ) -> Result<Self> {
        // SAFETY: forwarded caller contract.
        let current = unsafe { read_slot(table, index)? };
        let slot = slot_address(table, index);
        let wrapper = fn_addr(wrapper);
        if current == wrapper {
            return Err(Error::AlreadyInstalled { addr: slot });
        }

        // SAFETY: slot is mapped; the writer handles protection.
        unsafe { writer.write(slot, &wrapper.to_ne_bytes())? };

        Ok(Self {
            table,
            index,
            // SAFETY: the slot held an `F` entry point per the contract above.
            original: unsafe { fn_from_addr(current) },
        })
    }

    /// The entry point slot `index` of `table` holds right now, without
    /// patching anything.
    ///
    /// # Safety
    /// As for [`VfuncHook::install`].
    pub unsafe fn current(table: usize, index: usize) -> Result<F> {
        // SAFETY: forwarded caller contract.
        let current = unsafe { read_slot(table, index)? };
        // SAFETY: the slot holds an `F` entry point per the contract.
        Ok(unsafe { fn_from_addr(current) })
    }

    /// The entry point the slot held before installation.
    pub fn original(&self) -> F {
        self.original
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn slot(&self) -> usize {
        slot_address(self.table, self.index)
    }
}

/// # Safety
/// `table` must be null or a live dispatch table with more than `index` slots.
unsafe fn read_slot(table: usize, index: usize) -> Result<usize> {
    if table == 0 {
        return Err(Error::NullTable);
    }
    // SAFETY: the caller guarantees the slot is inside a live table.
    let current = unsafe { ptr::read_volatile(slot_address(table, index) as *const usize) };
    if current == 0 {
        return Err(Error::EmptySlot { table, index });
    }
    Ok(current)
}

pub(crate) fn slot_address(table: usize, index: usize) -> usize {
    table.wrapping_add(index * size_of::<usize>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::PlainWriter;

    type Getter = extern "C" fn() -> u32;

    extern "C" fn first() -> u32 {
        1
    }

    extern "C" fn second() -> u32 {
        2
    }

    extern "C" fn replacement() -> u32 {
        42
    }

    fn table() -> Vec<usize> {
        vec![first as Getter as usize, second as Getter as usize]
    }

    #[test]
    fn test_install_redirects_slot_and_keeps_original() {
        let mut table = table();
        let base = table.as_mut_ptr() as usize;

        let hook = unsafe { VfuncHook::install(&PlainWriter, base, 1, replacement as Getter) }.unwrap();

        assert_eq!(table[0], first as Getter as usize);
        assert_eq!(table[1], replacement as Getter as usize);
        assert_eq!((hook.original())(), 2);
        assert_eq!(hook.slot(), base + size_of::<usize>());
        assert_eq!(hook.index(), 1);

        let patched: Getter = unsafe { std::mem::transmute(table[1]) };
        assert_eq!(patched(), 42);
    }

    #[test]
    fn test_current_reads_without_patching() {
        let mut table = table();
        let base = table.as_mut_ptr() as usize;

        let current: Getter = unsafe { VfuncHook::current(base, 1) }.unwrap();
        assert_eq!(current(), 2);
        assert_eq!(table[1], second as Getter as usize);

        let err = unsafe { VfuncHook::<Getter>::current(0, 1) }.unwrap_err();
        assert!(matches!(err, Error::NullTable));
    }

    #[test]
    fn test_install_refuses_slot_already_holding_wrapper() {
        let mut table = table();
        let base = table.as_mut_ptr() as usize;

        unsafe { VfuncHook::install(&PlainWriter, base, 0, replacement as Getter) }.unwrap();
        let err = unsafe { VfuncHook::install(&PlainWriter, base, 0, replacement as Getter) }.unwrap_err();

        assert!(matches!(err, Error::AlreadyInstalled { addr } if addr == base));
    }

    #[test]
    fn test_install_rejects_null_table_and_empty_slot() {
        let err = unsafe { VfuncHook::install(&PlainWriter, 0, 3, replacement as Getter) }.unwrap_err();
        assert!(matches!(err, Error::NullTable));

        let mut table = vec![0usize; 2];
        let base = table.as_mut_ptr() as usize;
        let err = unsafe { VfuncHook::install(&PlainWriter, base, 1, replacement as Getter) }.unwrap_err();
        assert!(matches!(err, Error::EmptySlot { index: 1, .. }));
        assert_eq!(table[1], 0);
    }
}
