//! Opaque adapter/output handles.
//!
//! A handle names a slot in one specific registry. The raw `u64` form packs
//! the registry serial (high 32 bits), a kind bit (bit 31) and `slot + 1`
//! (bits 0..31), so zero and cross-kind values never decode.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

const KIND_BIT: u64 = 1 << 31;
const SLOT_MASK: u64 = KIND_BIT - 1;

/// Largest slot index a handle can encode.
pub(crate) const MAX_SLOTS: usize = (SLOT_MASK - 1) as usize;

static NEXT_SERIAL: AtomicU32 = AtomicU32::new(1);

/// Process-unique, non-zero registry serial.
pub(crate) fn next_serial() -> u32 {
    loop {
        let serial = NEXT_SERIAL.fetch_add(1, Ordering::Relaxed);
        if serial != 0 {
            return serial;
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct Slot {
    registry: u32,
    index: u32,
}

impl Slot {
    fn new(registry: u32, index: usize) -> Self {
        debug_assert!(index <= MAX_SLOTS);
        Self {
            registry,
            index: index as u32,
        }
    }

    fn encode(self, output: bool) -> u64 {
        let kind = if output { KIND_BIT } else { 0 };
        (u64::from(self.registry) << 32) | kind | (u64::from(self.index) + 1)
    }

    fn decode(raw: u64, output: bool) -> Option<Self> {
        let registry = (raw >> 32) as u32;
        let slot = raw & SLOT_MASK;
        if registry == 0 || slot == 0 || ((raw & KIND_BIT) != 0) != output {
            return None;
        }
        Some(Self {
            registry,
            index: (slot - 1) as u32,
        })
    }
}

/// Opaque reference to an adapter owned by an [`AdapterRegistry`](crate::AdapterRegistry).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdapterHandle(Slot);

impl AdapterHandle {
    pub(crate) fn new(registry: u32, index: usize) -> Self {
        Self(Slot::new(registry, index))
    }

    pub(crate) fn registry(self) -> u32 {
        self.0.registry
    }

    /// Position of the adapter in its registry.
    pub fn index(self) -> usize {
        self.0.index as usize
    }

    /// Integer form for callers that store handles as plain values.
    pub fn into_raw(self) -> u64 {
        self.0.encode(false)
    }

    /// Rebuild a handle from [`into_raw`](Self::into_raw). Values that cannot
    /// be adapter handles yield `None`; anything else still has to pass
    /// `is_adapter` before it is trusted.
    pub fn from_raw(raw: u64) -> Option<Self> {
        Slot::decode(raw, false).map(Self)
    }
}

impl fmt::Debug for AdapterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdapterHandle({}:{})", self.0.registry, self.0.index)
    }
}

/// Opaque reference to an output owned by an [`AdapterRegistry`](crate::AdapterRegistry).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputHandle(Slot);

impl OutputHandle {
    pub(crate) fn new(registry: u32, index: usize) -> Self {
        Self(Slot::new(registry, index))
    }

    pub(crate) fn registry(self) -> u32 {
        self.0.registry
    }

    /// Position of the output in its registry's flat output list.
    pub fn index(self) -> usize {
        self.0.index as usize
    }

    pub fn into_raw(self) -> u64 {
        self.0.encode(true)
    }

    pub fn from_raw(raw: u64) -> Option<Self> {
        Slot::decode(raw, true).map(Self)
    }
}

impl fmt::Debug for OutputHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputHandle({}:{})", self.0.registry, self.0.index)
    }
}
