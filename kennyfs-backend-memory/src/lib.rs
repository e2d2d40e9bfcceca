//! A minimal in-memory [`Backend`] implementation.
//!
//! This is *not* the local POSIX backend spec.md names as out of scope — it
//! holds a tree of in-memory nodes, not real files on disk — but a stand-in
//! that makes `kennyfs-server` runnable and testable without that brick
//! (see SPEC_FULL.md §10, "Supplemented features").

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use kennyfs_core::backend::{Backend, DirEntry, OpenReply};
use kennyfs_core::context::Context;
use kennyfs_core::errno::{BackendResult, EBADF, EEXIST, EFBIG, EINVAL, EISDIR, ENOENT, ENOTDIR, ENOTEMPTY};
use kennyfs_core::handles::FileHandle;
use kennyfs_wire::{Stat, TimespecPair};

const DEFAULT_DIR_MODE: u32 = 0o40755;
const DEFAULT_FILE_MODE: u32 = 0o100644;

/// Cap on a single in-memory file's size, guarding against a client-supplied
/// `write`/`truncate` offset driving an unbounded `Vec` allocation. The real
/// POSIX backend this stands in for would hit the filesystem's own quota
/// long before this; this stand-in has no such backstop of its own.
const MAX_FILE_SIZE: u64 = 64 * 1024 * 1024;

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[derive(Debug, Clone)]
enum NodeKind {
    Dir,
    File(Vec<u8>),
    Symlink(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    mode: u32,
    uid: u32,
    gid: u32,
    atime: u64,
    mtime: u64,
    ctime: u64,
}

impl Node {
    fn new_dir() -> Self {
        let now = now_secs();
        Self { kind: NodeKind::Dir, mode: DEFAULT_DIR_MODE, uid: 0, gid: 0, atime: now, mtime: now, ctime: now }
    }

    fn new_file(mode: u32) -> Self {
        let now = now_secs();
        Self { kind: NodeKind::File(Vec::new()), mode, uid: 0, gid: 0, atime: now, mtime: now, ctime: now }
    }

    fn new_symlink(target: String) -> Self {
        let now = now_secs();
        Self { kind: NodeKind::Symlink(target), mode: 0o120777, uid: 0, gid: 0, atime: now, mtime: now, ctime: now }
    }

    fn stat(&self, ino: u64) -> Stat {
        let size = match &self.kind {
            NodeKind::File(data) => data.len() as u64,
            NodeKind::Symlink(target) => target.len() as u64,
            NodeKind::Dir => 0,
        };
        let nlink = if matches!(self.kind, NodeKind::Dir) { 2 } else { 1 };
        Stat {
            dev: 0,
            ino,
            mode: self.mode,
            nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            size,
            blksize: 4096,
            blocks: size.div_ceil(512),
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
        }
    }
}

fn normalize(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn parent_of(path: &str) -> String {
    if path == "/" {
        return "/".to_string();
    }
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
        None => "/".to_string(),
    }
}

fn is_direct_child(parent: &str, candidate: &str) -> bool {
    if candidate == parent {
        return false;
    }
    let prefix = if parent == "/" { "/".to_string() } else { format!("{parent}/") };
    candidate.starts_with(&prefix) && !candidate[prefix.len()..].contains('/')
}

/// A server-issued directory-read handle snapshots the child names at
/// `opendir` time, so entries added or removed mid-readdir by another
/// request are simply not reflected — the handle is a cursor over a
/// point-in-time listing, not a live view.
pub struct DirCursor {
    entries: Vec<String>,
}

/// A single in-memory tree of nodes keyed by normalized absolute path, plus
/// an open-file-handle table mapping the opaque 8-byte `FileHandle` the
/// wire carries back to the path it was opened against.
pub struct MemoryBackend {
    nodes: Mutex<BTreeMap<String, Node>>,
    open_files: Mutex<BTreeMap<u64, String>>,
    next_fh: AtomicU64,
    next_ino: AtomicU64,
    inos: Mutex<BTreeMap<String, u64>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::new_dir());
        let mut inos = BTreeMap::new();
        inos.insert("/".to_string(), 1);
        Self {
            nodes: Mutex::new(nodes),
            open_files: Mutex::new(BTreeMap::new()),
            next_fh: AtomicU64::new(1),
            next_ino: AtomicU64::new(2),
            inos: Mutex::new(inos),
        }
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn ino_for(&self, path: &str) -> u64 {
        let mut inos = self.inos.lock().expect("inos mutex poisoned");
        if let Some(&ino) = inos.get(path) {
            return ino;
        }
        let ino = self.next_ino.fetch_add(1, Ordering::Relaxed);
        inos.insert(path.to_string(), ino);
        ino
    }

    fn alloc_fh(&self, path: &str) -> FileHandle {
        let id = self.next_fh.fetch_add(1, Ordering::Relaxed);
        self.open_files.lock().expect("open_files mutex poisoned").insert(id, path.to_string());
        FileHandle(id.to_be_bytes())
    }

    fn path_for_fh(&self, fh: FileHandle) -> BackendResult<String> {
        let id = u64::from_be_bytes(fh.to_wire());
        self.open_files
            .lock()
            .expect("open_files mutex poisoned")
            .get(&id)
            .cloned()
            .ok_or(EBADF)
    }
}

impl Backend for MemoryBackend {
    type DirHandle = DirCursor;

    fn getattr(&self, _ctx: &Context, path: &str) -> BackendResult<Stat> {
        let path = normalize(path);
        let nodes = self.nodes.lock().expect("nodes mutex poisoned");
        let node = nodes.get(&path).ok_or(ENOENT)?;
        Ok(node.stat(self.ino_for(&path)))
    }

    fn readlink(&self, _ctx: &Context, path: &str) -> BackendResult<Vec<u8>> {
        let path = normalize(path);
        let nodes = self.nodes.lock().expect("nodes mutex poisoned");
        match &nodes.get(&path).ok_or(ENOENT)?.kind {
            NodeKind::Symlink(target) => Ok(target.clone().into_bytes()),
            _ => Err(EINVAL),
        }
    }

    fn mknod(&self, _ctx: &Context, path: &str, mode: u32) -> BackendResult<()> {
        let path = normalize(path);
        let mut nodes = self.nodes.lock().expect("nodes mutex poisoned");
        if nodes.contains_key(&path) {
            return Err(EEXIST);
        }
        if !nodes.contains_key(&parent_of(&path)) {
            return Err(ENOENT);
        }
        let mode = if mode == 0 { DEFAULT_FILE_MODE } else { mode };
        nodes.insert(path, Node::new_file(mode));
        Ok(())
    }

    fn mkdir(&self, _ctx: &Context, path: &str, mode: u32) -> BackendResult<()> {
        let path = normalize(path);
        let mut nodes = self.nodes.lock().expect("nodes mutex poisoned");
        if nodes.contains_key(&path) {
            return Err(EEXIST);
        }
        if !nodes.contains_key(&parent_of(&path)) {
            return Err(ENOENT);
        }
        let mut dir = Node::new_dir();
        if mode != 0 {
            dir.mode = mode | 0o40000;
        }
        nodes.insert(path, dir);
        Ok(())
    }

    fn unlink(&self, _ctx: &Context, path: &str) -> BackendResult<()> {
        let path = normalize(path);
        let mut nodes = self.nodes.lock().expect("nodes mutex poisoned");
        match nodes.get(&path) {
            Some(node) if matches!(node.kind, NodeKind::Dir) => return Err(EISDIR),
            Some(_) => {}
            None => return Err(ENOENT),
        }
        nodes.remove(&path);
        Ok(())
    }

    fn rmdir(&self, _ctx: &Context, path: &str) -> BackendResult<()> {
        let path = normalize(path);
        let mut nodes = self.nodes.lock().expect("nodes mutex poisoned");
        match nodes.get(&path) {
            Some(node) if !matches!(node.kind, NodeKind::Dir) => return Err(ENOTDIR),
            Some(_) => {}
            None => return Err(ENOENT),
        }
        if nodes.keys().any(|candidate| is_direct_child(&path, candidate)) {
            return Err(ENOTEMPTY);
        }
        nodes.remove(&path);
        Ok(())
    }

    fn symlink(&self, _ctx: &Context, target: &str, linkpath: &str) -> BackendResult<()> {
        let linkpath = normalize(linkpath);
        let mut nodes = self.nodes.lock().expect("nodes mutex poisoned");
        if nodes.contains_key(&linkpath) {
            return Err(EEXIST);
        }
        if !nodes.contains_key(&parent_of(&linkpath)) {
            return Err(ENOENT);
        }
        nodes.insert(linkpath, Node::new_symlink(target.to_string()));
        Ok(())
    }

    fn rename(&self, _ctx: &Context, from: &str, to: &str) -> BackendResult<()> {
        let from = normalize(from);
        let to = normalize(to);
        let mut nodes = self.nodes.lock().expect("nodes mutex poisoned");
        let from_is_dir = matches!(nodes.get(&from).ok_or(ENOENT)?.kind, NodeKind::Dir);
        if !nodes.contains_key(&parent_of(&to)) {
            return Err(ENOENT);
        }
        // A pre-existing `to` is replaced, never merged with: POSIX rename(2)
        // requires the old `to` to vanish entirely, so it has to be checked
        // and torn down the same way `rmdir`/`unlink` would before the move.
        if let Some(existing) = nodes.get(&to) {
            match (&existing.kind, from_is_dir) {
                (NodeKind::Dir, false) => return Err(EISDIR),
                (NodeKind::Dir, true) => {
                    if nodes.keys().any(|candidate| is_direct_child(&to, candidate)) {
                        return Err(ENOTEMPTY);
                    }
                }
                (_, true) => return Err(ENOTDIR),
                (_, false) => {}
            }
            nodes.remove(&to);
        }
        let moved_children: Vec<String> =
            nodes.keys().filter(|candidate| candidate.starts_with(&format!("{from}/"))).cloned().collect();
        let node = nodes.remove(&from).expect("checked above");
        for child in moved_children {
            let suffix = &child[from.len()..];
            let new_child = format!("{to}{suffix}");
            let child_node = nodes.remove(&child).expect("collected from the same map");
            nodes.insert(new_child, child_node);
        }
        nodes.insert(to, node);
        Ok(())
    }

    fn link(&self, _ctx: &Context, oldpath: &str, newpath: &str) -> BackendResult<()> {
        let oldpath = normalize(oldpath);
        let newpath = normalize(newpath);
        let mut nodes = self.nodes.lock().expect("nodes mutex poisoned");
        let node = nodes.get(&oldpath).ok_or(ENOENT)?.clone();
        if matches!(node.kind, NodeKind::Dir) {
            return Err(EISDIR);
        }
        if nodes.contains_key(&newpath) {
            return Err(EEXIST);
        }
        nodes.insert(newpath, node);
        Ok(())
    }

    fn chmod(&self, _ctx: &Context, path: &str, mode: u32) -> BackendResult<()> {
        let path = normalize(path);
        let mut nodes = self.nodes.lock().expect("nodes mutex poisoned");
        let node = nodes.get_mut(&path).ok_or(ENOENT)?;
        node.mode = mode;
        node.ctime = now_secs();
        Ok(())
    }

    fn chown(&self, _ctx: &Context, path: &str, uid: u32, gid: u32) -> BackendResult<()> {
        let path = normalize(path);
        let mut nodes = self.nodes.lock().expect("nodes mutex poisoned");
        let node = nodes.get_mut(&path).ok_or(ENOENT)?;
        node.uid = uid;
        node.gid = gid;
        node.ctime = now_secs();
        Ok(())
    }

    fn truncate(&self, _ctx: &Context, path: &str, size: u64) -> BackendResult<()> {
        if size > MAX_FILE_SIZE {
            return Err(EFBIG);
        }
        let path = normalize(path);
        let mut nodes = self.nodes.lock().expect("nodes mutex poisoned");
        let node = nodes.get_mut(&path).ok_or(ENOENT)?;
        match &mut node.kind {
            NodeKind::File(data) => {
                data.resize(size as usize, 0);
                node.mtime = now_secs();
                Ok(())
            }
            NodeKind::Dir => Err(EISDIR),
            NodeKind::Symlink(_) => Err(EINVAL),
        }
    }

    fn open(&self, _ctx: &Context, path: &str, _flags: u32) -> BackendResult<OpenReply> {
        let path = normalize(path);
        let nodes = self.nodes.lock().expect("nodes mutex poisoned");
        match nodes.get(&path) {
            Some(node) if matches!(node.kind, NodeKind::Dir) => return Err(EISDIR),
            Some(_) => {}
            None => return Err(ENOENT),
        }
        drop(nodes);
        Ok(OpenReply { fh: self.alloc_fh(&path), direct_io: false, keep_cache: false, non_seekable: false })
    }

    fn create(&self, ctx: &Context, path: &str, flags: u32, mode: u32) -> BackendResult<OpenReply> {
        let normalized = normalize(path);
        {
            let mut nodes = self.nodes.lock().expect("nodes mutex poisoned");
            if !nodes.contains_key(&normalized) {
                if !nodes.contains_key(&parent_of(&normalized)) {
                    return Err(ENOENT);
                }
                let mode = if mode == 0 { DEFAULT_FILE_MODE } else { mode };
                nodes.insert(normalized.clone(), Node::new_file(mode));
            }
        }
        self.open(ctx, &normalized, flags)
    }

    fn read(&self, _ctx: &Context, fh: FileHandle, offset: u64, len: u32) -> BackendResult<Vec<u8>> {
        let path = self.path_for_fh(fh)?;
        let nodes = self.nodes.lock().expect("nodes mutex poisoned");
        let node = nodes.get(&path).ok_or(EBADF)?;
        let data = match &node.kind {
            NodeKind::File(data) => data,
            _ => return Err(EINVAL),
        };
        let start = (offset as usize).min(data.len());
        let end = start.saturating_add(len as usize).min(data.len());
        Ok(data[start..end].to_vec())
    }

    fn write(&self, _ctx: &Context, fh: FileHandle, offset: u64, data: &[u8]) -> BackendResult<u32> {
        let path = self.path_for_fh(fh)?;
        let mut nodes = self.nodes.lock().expect("nodes mutex poisoned");
        let node = nodes.get_mut(&path).ok_or(EBADF)?;
        let buf = match &mut node.kind {
            NodeKind::File(buf) => buf,
            _ => return Err(EINVAL),
        };
        let end = offset.checked_add(data.len() as u64).filter(|&end| end <= MAX_FILE_SIZE).ok_or(EFBIG)?;
        let start = offset as usize;
        let end = end as usize;
        if buf.len() < end {
            buf.resize(end, 0);
        }
        buf[start..end].copy_from_slice(data);
        node.mtime = now_secs();
        Ok(data.len() as u32)
    }

    fn flush(&self, _ctx: &Context, fh: FileHandle) -> BackendResult<()> {
        self.path_for_fh(fh)?;
        Ok(())
    }

    fn release(&self, _ctx: &Context, fh: FileHandle) -> BackendResult<()> {
        let id = u64::from_be_bytes(fh.to_wire());
        self.open_files.lock().expect("open_files mutex poisoned").remove(&id).ok_or(EBADF)?;
        Ok(())
    }

    fn fsync(&self, _ctx: &Context, fh: FileHandle, _datasync: bool) -> BackendResult<()> {
        self.path_for_fh(fh)?;
        Ok(())
    }

    fn opendir(&self, _ctx: &Context, path: &str) -> BackendResult<Self::DirHandle> {
        let path = normalize(path);
        let nodes = self.nodes.lock().expect("nodes mutex poisoned");
        match nodes.get(&path) {
            Some(node) if !matches!(node.kind, NodeKind::Dir) => return Err(ENOTDIR),
            Some(_) => {}
            None => return Err(ENOENT),
        }
        let mut entries: Vec<String> =
            nodes.keys().filter(|candidate| is_direct_child(&path, candidate)).cloned().collect();
        entries.sort();
        Ok(DirCursor { entries })
    }

    fn readdir(
        &self,
        _ctx: &Context,
        dh: &Self::DirHandle,
        offset: u64,
        filler: &mut dyn FnMut(DirEntry) -> bool,
    ) -> BackendResult<()> {
        let nodes = self.nodes.lock().expect("nodes mutex poisoned");
        for (idx, path) in dh.entries.iter().enumerate().skip(offset as usize) {
            let Some(node) = nodes.get(path) else { continue };
            let name = path.rsplit('/').next().unwrap_or(path).as_bytes().to_vec();
            let entry = DirEntry { name, stat: node.stat(self.ino_for(path)), next_offset: idx as u64 + 1 };
            if !filler(entry) {
                break;
            }
        }
        Ok(())
    }

    fn releasedir(&self, _ctx: &Context, _dh: Self::DirHandle) -> BackendResult<()> {
        Ok(())
    }

    fn fgetattr(&self, _ctx: &Context, fh: FileHandle) -> BackendResult<Stat> {
        let path = self.path_for_fh(fh)?;
        let nodes = self.nodes.lock().expect("nodes mutex poisoned");
        Ok(nodes.get(&path).ok_or(EBADF)?.stat(self.ino_for(&path)))
    }

    fn utimens(&self, _ctx: &Context, path: &str, times: TimespecPair) -> BackendResult<()> {
        let path = normalize(path);
        let mut nodes = self.nodes.lock().expect("nodes mutex poisoned");
        let node = nodes.get_mut(&path).ok_or(ENOENT)?;
        node.atime = times.atime_sec;
        node.mtime = times.mtime_sec;
        Ok(())
    }
}
