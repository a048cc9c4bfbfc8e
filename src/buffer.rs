//! Memory descriptors shared with the hardware decoder.
//!
//! Decoder memory has two addresses: the CPU-side virtual address the
//! process reads and writes, and the bus address the VPU DMA engine uses.
//! Keeping both in a typed descriptor avoids casting pointers to integers
//! and back; conversion to raw values happens only where a vendor call
//! needs them.

use std::fmt;

use crate::error::{BitstreamError, Result};

/// Alignment the decoder requires for frame buffers and bitstream memory.
pub const FRAME_ALIGN: usize = 16;

/// Maximum number of blocks of each kind tracked by [`DecoderMemory`].
pub const MAX_MEMORY_BLOCKS: usize = 20;

/// CPU-side virtual address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtAddr(pub usize);

/// Physical (bus) address as seen by the VPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(pub u64);

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Round `value` up to a multiple of `align` (a power of two).
///
/// `None` if the result does not fit in `usize`.
pub const fn align_up(value: usize, align: usize) -> Option<usize> {
    match value.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}

/// One region of decoder memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub virt: VirtAddr,
    /// `None` for plain virtual memory that the VPU never touches directly.
    pub phys: Option<PhysAddr>,
    pub size: usize,
}

impl BufferDescriptor {
    pub fn virtual_only(virt: VirtAddr, size: usize) -> Self {
        Self {
            virt,
            phys: None,
            size,
        }
    }

    pub fn contiguous(virt: VirtAddr, phys: PhysAddr, size: usize) -> Self {
        Self {
            virt,
            phys: Some(phys),
            size,
        }
    }

    pub fn is_contiguous(&self) -> bool {
        self.phys.is_some()
    }

    /// Sub-region starting `offset` bytes in; both addresses move together.
    pub fn offset(&self, offset: usize) -> Result<Self> {
        let overrun = || BitstreamError::BufferOverrun {
            offset,
            size: self.size,
        };
        if offset > self.size {
            return Err(overrun());
        }

        let virt = self.virt.0.checked_add(offset).ok_or_else(overrun)?;
        let phys = match self.phys {
            Some(p) => Some(PhysAddr(p.0.checked_add(offset as u64).ok_or_else(overrun)?)),
            None => None,
        };
        Ok(Self {
            virt: VirtAddr(virt),
            phys,
            size: self.size - offset,
        })
    }

    /// Sub-region whose virtual address is rounded up to `align`.
    pub fn aligned(&self, align: usize) -> Result<Self> {
        let aligned = align_up(self.virt.0, align).ok_or(BitstreamError::BufferOverrun {
            offset: align,
            size: self.size,
        })?;
        self.offset(aligned - self.virt.0)
    }
}

/// Blocks allocated on behalf of the decoder, released together on close.
#[derive(Debug, Default)]
pub struct DecoderMemory {
    virt: Vec<BufferDescriptor>,
    phys: Vec<BufferDescriptor>,
}

impl DecoderMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a block. Contiguous and virtual-only blocks have separate
    /// tables of [`MAX_MEMORY_BLOCKS`] entries each.
    pub fn record(&mut self, block: BufferDescriptor) -> Result<()> {
        let table = if block.is_contiguous() {
            &mut self.phys
        } else {
            &mut self.virt
        };
        if table.len() >= MAX_MEMORY_BLOCKS {
            return Err(BitstreamError::MemoryTableFull {
                capacity: MAX_MEMORY_BLOCKS,
            });
        }

        tracing::trace!(
            virt = %block.virt,
            phys = ?block.phys.map(|p| p.0),
            size = block.size,
            "decoder memory block recorded"
        );
        table.push(block);
        Ok(())
    }

    pub fn virtual_blocks(&self) -> &[BufferDescriptor] {
        &self.virt
    }

    pub fn contiguous_blocks(&self) -> &[BufferDescriptor] {
        &self.phys
    }

    pub fn total_size(&self) -> usize {
        self.virt.iter().chain(&self.phys).map(|b| b.size).sum()
    }

    /// Empty both tables, handing every block back to the caller to free.
    pub fn release_all(&mut self) -> Vec<BufferDescriptor> {
        let mut blocks = std::mem::take(&mut self.virt);
        blocks.append(&mut self.phys);
        tracing::debug!(blocks = blocks.len(), "decoder memory released");
        blocks
    }
}
