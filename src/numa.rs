//! NUMA-interleaved slot storage (Linux, feature `numa`).
//!
//! The slot array is mapped anonymously with `mmap`, which yields zeroed,
//! page-aligned memory, and then bound with `mbind(MPOL_INTERLEAVE)` to every
//! online memory node before any page is touched. Pages are therefore
//! faulted in round-robin across nodes, so no single node becomes the hotspot
//! when many cores hammer the cache.
//!
//! Binding is best-effort: on single-node machines, or when the kernel rejects
//! the policy, the mapping is still used as plain memory and a warning is logged.

use crate::storage::SlotAllocator;
use core::ptr::NonNull;
use core::sync::atomic::AtomicU32;
use libc::{c_ulong, c_void};
use log::{debug, warn};
use std::alloc::{handle_alloc_error, Layout};
use std::fs;
use std::io;
use std::vec::Vec;

// mempolicy.h
const MPOL_INTERLEAVE: libc::c_int = 3;

const ONLINE_NODES_PATH: &str = "/sys/devices/system/node/online";

/// Slot storage interleaved across all online NUMA nodes.
#[derive(Debug, Clone, Default)]
pub struct InterleavedAllocator {
    nodes: Vec<usize>,
}

impl InterleavedAllocator {
    /// Discovers the online memory nodes.
    ///
    /// An unreadable node list is treated as a single-node machine.
    pub fn new() -> Self {
        let nodes = match fs::read_to_string(ONLINE_NODES_PATH) {
            Ok(list) => parse_node_list(&list),
            Err(err) => {
                warn!("cannot read {ONLINE_NODES_PATH}: {err}");
                Vec::new()
            }
        };
        debug!("numa: online nodes {nodes:?}");
        Self { nodes }
    }

    /// Online nodes the memory is spread over.
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    fn bind(&self, addr: *mut c_void, len: usize) -> io::Result<()> {
        let bits = c_ulong::BITS as usize;
        let Some(&max) = self.nodes.iter().max() else {
            return Ok(());
        };
        let mut mask: Vec<c_ulong> = std::vec![0; max / bits + 1];
        for &node in &self.nodes {
            mask[node / bits] |= (1 as c_ulong) << (node % bits);
        }
        // The kernel reads `maxnode - 1` bits from the mask.
        let maxnode = (mask.len() * bits + 1) as c_ulong;
        // SAFETY: `addr..addr+len` is a mapping we own; `mask` outlives the call.
        let rc = unsafe {
            libc::syscall(
                libc::SYS_mbind,
                addr,
                len as c_ulong,
                MPOL_INTERLEAVE,
                mask.as_ptr(),
                maxnode,
                0 as libc::c_uint,
            )
        };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

/// Parses a kernel node list such as `0-3,5,7-8`.
fn parse_node_list(list: &str) -> Vec<usize> {
    let mut nodes = Vec::new();
    for part in list.trim().split(',').filter(|part| !part.is_empty()) {
        match part.split_once('-') {
            Some((lo, hi)) => {
                if let (Ok(lo), Ok(hi)) = (lo.parse::<usize>(), hi.parse::<usize>()) {
                    nodes.extend(lo..=hi);
                }
            }
            None => {
                if let Ok(node) = part.parse::<usize>() {
                    nodes.push(node);
                }
            }
        }
    }
    nodes
}

// SAFETY: anonymous private mappings are zero-filled and page aligned; `allocate`
// asserts the requested alignment does not exceed the page size.
unsafe impl SlotAllocator for InterleavedAllocator {
    fn allocate(&self, len: usize, align: usize) -> NonNull<AtomicU32> {
        let layout = crate::storage::slot_layout(len, align);
        // SAFETY: sysconf has no preconditions.
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        assert!(align <= page, "line size exceeds the page size");

        // SAFETY: requesting a fresh anonymous mapping; no existing memory is affected.
        let addr = unsafe {
            libc::mmap(
                core::ptr::null_mut(),
                layout.size(),
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            handle_alloc_error(Layout::from_size_align(layout.size(), page).unwrap_or(layout));
        }

        if self.nodes.len() > 1 {
            if let Err(err) = self.bind(addr, layout.size()) {
                warn!("mbind(MPOL_INTERLEAVE) failed, using local placement: {err}");
            }
        } else {
            debug!("numa: single node, interleaving skipped");
        }

        match NonNull::new(addr.cast::<AtomicU32>()) {
            Some(ptr) => ptr,
            None => handle_alloc_error(layout),
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<AtomicU32>, len: usize, align: usize) {
        let layout = crate::storage::slot_layout(len, align);
        // SAFETY: caller guarantees `ptr` is the start of a mapping of this size.
        let rc = unsafe { libc::munmap(ptr.as_ptr().cast::<c_void>(), layout.size()) };
        if rc != 0 {
            warn!("munmap failed: {}", io::Error::last_os_error());
        }
    }

    fn name(&self) -> &'static str {
        "interleaved"
    }
}
