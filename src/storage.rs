//! Slot storage and allocation strategies.
//!
//! The cache logic never touches an allocator directly. It asks a
//! [`SlotAllocator`] for a zeroed, line-aligned run of [`AtomicU32`] slots and
//! hands the same allocator the memory back when the table is dropped.
//!
//! Two strategies ship with the crate:
//!
//! | Strategy | Placement | Notes |
//! |----------|-----------|-------|
//! | [`AlignedAllocator`] | [`Placement::Aligned`] | Global allocator, `alloc_zeroed` |
//! | `InterleavedAllocator` | [`Placement::Interleaved`] | `mmap` + `mbind(MPOL_INTERLEAVE)`, feature `numa` |

extern crate alloc;

use crate::config::Placement;
use alloc::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use alloc::boxed::Box;
use core::fmt;
use core::ops::Deref;
use core::ptr::NonNull;
use core::sync::atomic::AtomicU32;

/// A strategy for obtaining the slot array.
///
/// # Safety
///
/// Implementors must return memory that is valid for reads and writes of
/// `len` consecutive `AtomicU32` values, aligned to at least `align` bytes,
/// and fully zeroed. The memory must stay valid until [`deallocate`] is called
/// with the same `len` and `align`.
///
/// [`deallocate`]: SlotAllocator::deallocate
pub unsafe trait SlotAllocator: Send + Sync {
    /// Allocates `len` zeroed slots aligned to `align` bytes.
    ///
    /// Allocation failure must not return; it aborts via `handle_alloc_error`.
    fn allocate(&self, len: usize, align: usize) -> NonNull<AtomicU32>;

    /// Returns memory obtained from [`allocate`](SlotAllocator::allocate).
    ///
    /// # Safety
    ///
    /// `ptr` must come from `self.allocate(len, align)` and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<AtomicU32>, len: usize, align: usize);

    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;
}

/// Layout of `len` slots aligned to `align` bytes.
///
/// # Panics
///
/// Panics if the size overflows `isize` or `align` is not a power of two.
pub(crate) fn slot_layout(len: usize, align: usize) -> Layout {
    Layout::array::<AtomicU32>(len)
        .and_then(|layout| layout.align_to(align))
        .expect("slot array layout overflows")
}

/// Slot storage from the global allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignedAllocator;

// SAFETY: `alloc_zeroed` returns zeroed memory for exactly `slot_layout(len, align)`,
// and null results never escape because `handle_alloc_error` diverges.
unsafe impl SlotAllocator for AlignedAllocator {
    fn allocate(&self, len: usize, align: usize) -> NonNull<AtomicU32> {
        let layout = slot_layout(len, align);
        assert!(layout.size() > 0, "slot array must not be empty");
        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        match NonNull::new(raw.cast::<AtomicU32>()) {
            Some(ptr) => ptr,
            None => handle_alloc_error(layout),
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<AtomicU32>, len: usize, align: usize) {
        // SAFETY: caller guarantees `ptr` came from `allocate` with the same layout.
        unsafe { dealloc(ptr.as_ptr().cast::<u8>(), slot_layout(len, align)) }
    }

    fn name(&self) -> &'static str {
        "aligned"
    }
}

impl Placement {
    /// Returns the allocator implementing this placement.
    ///
    /// Without the `numa` feature (or off Linux) interleaving is unavailable and
    /// the aligned allocator is returned instead.
    pub fn allocator(&self) -> Box<dyn SlotAllocator> {
        match self {
            Placement::Aligned => Box::new(AlignedAllocator),
            #[cfg(all(feature = "numa", target_os = "linux"))]
            Placement::Interleaved => Box::new(crate::numa::InterleavedAllocator::new()),
            #[cfg(not(all(feature = "numa", target_os = "linux")))]
            Placement::Interleaved => {
                log::warn!("interleaved placement unavailable, falling back to aligned");
                Box::new(AlignedAllocator)
            }
        }
    }
}

/// Owned, fixed-size array of atomic slots.
///
/// Dereferences to `[AtomicU32]`, so all slot access is bounds-checked index
/// arithmetic; the raw pointer never leaves this type.
pub(crate) struct SlotTable {
    ptr: NonNull<AtomicU32>,
    len: usize,
    align: usize,
    allocator: Box<dyn SlotAllocator>,
}

// SAFETY: the table exclusively owns its allocation and only hands out `&[AtomicU32]`,
// which is itself `Send + Sync`. The allocator is required to be `Send + Sync`.
unsafe impl Send for SlotTable {}

// SAFETY: see above; shared access only ever goes through atomics.
unsafe impl Sync for SlotTable {}

impl SlotTable {
    /// Allocates `len` zeroed slots aligned to `align` bytes.
    pub(crate) fn new(len: usize, align: usize, allocator: Box<dyn SlotAllocator>) -> Self {
        let ptr = allocator.allocate(len, align);
        debug_assert_eq!(ptr.as_ptr() as usize % align, 0, "allocator ignored alignment");
        SlotTable {
            ptr,
            len,
            align,
            allocator,
        }
    }

    /// Name of the strategy that owns this memory.
    pub(crate) fn allocator_name(&self) -> &'static str {
        self.allocator.name()
    }
}

impl Deref for SlotTable {
    type Target = [AtomicU32];

    #[inline]
    fn deref(&self) -> &[AtomicU32] {
        // SAFETY: `ptr` is valid for `len` initialized (zeroed) atomics until drop.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for SlotTable {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from this allocator with the same `len` and `align`,
        // and `&mut self` proves no slot reference outlives this call.
        unsafe { self.allocator.deallocate(self.ptr, self.len, self.align) }
    }
}

impl fmt::Debug for SlotTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotTable")
            .field("len", &self.len)
            .field("align", &self.align)
            .field("allocator", &self.allocator.name())
            .finish()
    }
}
