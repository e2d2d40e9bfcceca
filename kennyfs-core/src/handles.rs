//! File handles and the directory-handle table.

use crate::errno::EBADF;

/// An 8-byte opaque identifier returned by `open`/`create`, consumed by
/// `read`/`write`/`flush`/`release`/`fsync`/`fgetattr`. The server never
/// interprets these bytes — they carry the backend's own file-handle value
/// unchanged, so this wrapper is deliberately a bag of bytes, not a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(pub [u8; 8]);

impl FileHandle {
    pub fn from_wire(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        FileHandle(raw)
    }

    pub fn to_wire(self) -> [u8; 8] {
        self.0
    }
}

/// A server-synthesized 8-byte directory-read handle: `(index: u32,
/// generation: u32)`, high half first. Opaque to the wire (it round-trips as
/// 8 raw bytes) but structured on the server side so a stale handle
/// presented after `releasedir` is rejected instead of aliasing a reused
/// slot — see spec.md Design Notes, "Opaque handles vs. raw pointers".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirHandle {
    index: u32,
    generation: u32,
}

impl DirHandle {
    pub fn to_wire(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&self.index.to_be_bytes());
        out[4..].copy_from_slice(&self.generation.to_be_bytes());
        out
    }

    pub fn from_wire(bytes: &[u8]) -> Self {
        let index = u32::from_be_bytes(bytes[0..4].try_into().expect("4 bytes"));
        let generation = u32::from_be_bytes(bytes[4..8].try_into().expect("4 bytes"));
        DirHandle { index, generation }
    }
}

struct Slot<D> {
    generation: u32,
    /// `None` once the slot is released but its generation has been bumped
    /// past the last live handle; kept to detect reuse-after-free distinctly
    /// from "never allocated".
    live: Option<D>,
}

/// Owns one entry per open directory: the backend's own directory-handle
/// value (`D`, an implementation detail of the `Backend`) plus the buffer
/// used to accumulate serialized entries across filler callbacks within one
/// `readdir` call. The buffer's leading 8 bytes are always reserved for the
/// reply header (see [`crate::reply`]) so the framed reply can be built
/// without a second copy.
pub struct DirHandleTable<D> {
    slots: Vec<Slot<D>>,
    free: Vec<u32>,
}

impl<D> Default for DirHandleTable<D> {
    fn default() -> Self {
        Self { slots: Vec::new(), free: Vec::new() }
    }
}

impl<D> DirHandleTable<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, backend_handle: D) -> DirHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.live = Some(backend_handle);
            DirHandle { index, generation: slot.generation }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot { generation: 0, live: Some(backend_handle) });
            DirHandle { index, generation: 0 }
        }
    }

    pub fn get(&self, handle: DirHandle) -> Result<&D, i32> {
        let slot = self.slots.get(handle.index as usize).ok_or(EBADF)?;
        if slot.generation != handle.generation {
            return Err(EBADF);
        }
        slot.live.as_ref().ok_or(EBADF)
    }

    /// Removes the entry, bumping its generation so a handle issued before
    /// this call can never again resolve, even if the slot is reused.
    pub fn remove(&mut self, handle: DirHandle) -> Result<D, i32> {
        let slot = self.slots.get_mut(handle.index as usize).ok_or(EBADF)?;
        if slot.generation != handle.generation {
            return Err(EBADF);
        }
        let backend_handle = slot.live.take().ok_or(EBADF)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Ok(backend_handle)
    }
}
