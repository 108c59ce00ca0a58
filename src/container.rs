//! The trie container: one growable little-endian byte buffer holding a
//! needle scratch area, a header, a cell arena, and a character-segment pool.
//!
//! Hostnames are stored right-to-left so that matching a query against the
//! set is a forward scan of pool bytes against a backward needle cursor, and
//! a stored hostname matches a query only at a label boundary (the query is
//! equal to it, or ends with `"." + hostname`). Cells reference each other
//! by u32 word index into the same buffer, which makes the whole structure
//! relocatable and lets the compacted buffer double as the serialised form.

use std::collections::HashMap;

use crate::error::{Result, TrieError};
use crate::iter::TrieIter;
use crate::matcher::{self, MatcherKind};
use crate::types::TrieRef;

/// Needle bytes live in `buf[0..254]`; the length byte is at offset 255.
pub(crate) const NEEDLE_CAP: usize = 254;
pub(crate) const NEEDLE_LEN_OFF: usize = 255;

/// Byte offsets of the four header slots.
const TRIE0_SLOT: usize = 256;
const TRIE1_SLOT: usize = 260;
pub(crate) const CHAR0_SLOT: usize = 264;
const CHAR1_SLOT: usize = 268;

/// Fixed start of the cell arena, directly after the header.
const TRIE0_OFF: u32 = 272;

/// Low 24 bits of a segment descriptor hold the pool offset.
pub(crate) const SEG_OFF_MASK: u32 = 0x00ff_ffff;

/// A cell is three u32 words: down, right, segment descriptor.
const CELL_BYTES: u32 = 12;

/// Headroom kept between the arena and the pool (two cells) and after the
/// pool (one full needle) so a single insertion never runs out of space.
const CELL_RESERVE: u32 = 24;
const TAIL_RESERVE: u32 = 256;

/// Buffers grow in 64 KiB pages.
const PAGE_SIZE: u32 = 65536;

const INITIAL_BYTE_LEN: usize = 131072;
const INITIAL_CHAR0: u32 = 65536;

/// Lowest usable pool start: arena start plus cell headroom.
const MIN_CHAR0: u32 = TRIE0_OFF + CELL_RESERVE;

fn round_up(v: u32, to: u32) -> u32 {
    (v + to - 1) / to * to
}

/// Compacted buffer layout returned by [`TrieContainer::optimize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrieLayout {
    /// Total buffer length in bytes.
    pub byte_length: usize,
    /// Start of the character-segment pool.
    pub char0: u32,
}

/// Container for one or more hostname tries sharing a single linear buffer.
///
/// The container owns the buffer; all mutation is `&mut` and single-threaded
/// (wrap it in a lock for multi-threaded hosts, see
/// [`HostnameSet`](crate::HostnameSet)). Matching reads the needle placed by
/// [`set_needle`](Self::set_needle) into the first 256 buffer bytes.
#[derive(Debug)]
pub struct TrieContainer {
    buf: Vec<u8>,
    /// Construction-only map from forward-order segment bytes to their pool
    /// offset. Dropped on `optimize`; never serialised.
    dedup: Option<HashMap<Box<[u8]>, u32>>,
}

impl TrieContainer {
    /// Word index of the first trie root allocated in a fresh container.
    pub const FIRST_TRIE_ROOT: u32 = TRIE0_OFF / 4;

    /// Create a container with the default layout (128 KiB buffer, pool
    /// starting at 64 KiB).
    pub fn new() -> Self {
        Self::with_layout(INITIAL_BYTE_LEN, INITIAL_CHAR0)
    }

    /// Create a container with an explicit buffer length and pool start.
    /// Both are clamped to workable minimums; the pool start is kept
    /// word-aligned.
    pub fn with_layout(byte_length: usize, char0: u32) -> Self {
        let char0 = round_up(char0.max(MIN_CHAR0), 4);
        let byte_length = byte_length.max((char0 + TAIL_RESERVE) as usize);
        let mut buf = vec![0u8; byte_length];
        write_u32(&mut buf, TRIE0_SLOT, TRIE0_OFF);
        write_u32(&mut buf, TRIE1_SLOT, TRIE0_OFF);
        write_u32(&mut buf, CHAR0_SLOT, char0);
        write_u32(&mut buf, CHAR1_SLOT, char0);
        Self {
            buf,
            dedup: Some(HashMap::new()),
        }
    }

    /// Reconstruct a container around a previously serialised buffer.
    ///
    /// The header and every allocated cell are validated so that all cell
    /// references and segment descriptors are in range; both matcher
    /// backends are then memory-safe on the accepted image. Semantic
    /// well-formedness (e.g. link acyclicity) is the producer's
    /// responsibility: the expected producer is a container's own
    /// serialised buffer, stored and restored verbatim.
    pub fn from_bytes(buf: Vec<u8>) -> Result<Self> {
        let min = TRIE0_OFF as usize;
        if buf.len() < min {
            return Err(TrieError::SnapshotTooSmall {
                len: buf.len(),
                min,
            });
        }
        let trie0 = read_u32(&buf, TRIE0_SLOT);
        let trie1 = read_u32(&buf, TRIE1_SLOT);
        let char0 = read_u32(&buf, CHAR0_SLOT);
        let char1 = read_u32(&buf, CHAR1_SLOT);
        if trie0 != TRIE0_OFF {
            return Err(TrieError::CorruptSnapshot(format!(
                "arena start {trie0}, expected {TRIE0_OFF}"
            )));
        }
        if trie1 < TRIE0_OFF || (trie1 - TRIE0_OFF) % CELL_BYTES != 0 {
            return Err(TrieError::CorruptSnapshot(format!(
                "arena end {trie1} is not a whole number of cells"
            )));
        }
        if !(trie1 <= char0 && char0 <= char1 && char1 as usize <= buf.len()) {
            return Err(TrieError::CorruptSnapshot(format!(
                "region order violated: trie1={trie1} char0={char0} char1={char1} len={}",
                buf.len()
            )));
        }
        if buf[NEEDLE_LEN_OFF] as usize > NEEDLE_CAP {
            return Err(TrieError::CorruptSnapshot(format!(
                "needle length {} exceeds {NEEDLE_CAP}",
                buf[NEEDLE_LEN_OFF]
            )));
        }
        let pool_len = char1 - char0;
        let mut cell = TRIE0_OFF;
        while cell < trie1 {
            let down = read_u32(&buf, cell as usize);
            let right = read_u32(&buf, cell as usize + 4);
            let seg = read_u32(&buf, cell as usize + 8);
            for (name, link) in [("down", down), ("right", right)] {
                if link == 0 {
                    continue;
                }
                let byte = link.checked_mul(4).unwrap_or(u32::MAX);
                if byte < TRIE0_OFF || byte >= trie1 || (byte - TRIE0_OFF) % CELL_BYTES != 0 {
                    return Err(TrieError::CorruptSnapshot(format!(
                        "cell at {cell}: {name} link {link} out of range"
                    )));
                }
            }
            if seg == 0 {
                // boundary cells never fork
                if down != 0 {
                    return Err(TrieError::CorruptSnapshot(format!(
                        "boundary cell at {cell} has a down link"
                    )));
                }
            } else {
                let len = seg >> 24;
                let off = seg & SEG_OFF_MASK;
                if len == 0 || off + len > pool_len {
                    return Err(TrieError::CorruptSnapshot(format!(
                        "cell at {cell}: segment ({len}, {off}) outside pool of {pool_len} bytes"
                    )));
                }
            }
            cell += CELL_BYTES;
        }
        Ok(Self { buf, dedup: None })
    }

    /// Rebuild a reference to a trie root inside a restored container.
    ///
    /// The first trie created in any container has root
    /// [`FIRST_TRIE_ROOT`](Self::FIRST_TRIE_ROOT). The stored-hostname count
    /// is recovered by walking the trie once.
    pub fn trie_at(&self, iroot: u32) -> Result<TrieRef> {
        if !self.contains_cell(iroot) {
            return Err(TrieError::CorruptSnapshot(format!(
                "no cell at word index {iroot}"
            )));
        }
        let mut trie = TrieRef { iroot, size: 0 };
        trie.size = self.iter(&trie).count() as u32;
        Ok(trie)
    }

    /// Allocate a fresh trie root. The new trie shares the segment pool with
    /// existing tries but no cells.
    pub fn create_trie(&mut self) -> TrieRef {
        if self.char0() - self.trie1() < CELL_BYTES {
            self.grow_buf();
        }
        let iroot = self.alloc_cell(0, 0, 0);
        TrieRef { iroot, size: 0 }
    }

    /// Place the query/insertion hostname into the needle scratch area.
    /// Hostnames are expected to be lowercase 7-bit ASCII; anything longer
    /// than 254 bytes keeps only its first 254.
    pub fn set_needle(&mut self, hostname: &str) -> &mut Self {
        let bytes = hostname.as_bytes();
        let n = bytes.len().min(NEEDLE_CAP);
        self.buf[..n].copy_from_slice(&bytes[..n]);
        self.buf[NEEDLE_LEN_OFF] = n as u8;
        self
    }

    /// Current needle bytes.
    pub fn needle(&self) -> &[u8] {
        &self.buf[..self.buf[NEEDLE_LEN_OFF] as usize]
    }

    /// Insert the current needle into the given trie. Returns `true` if the
    /// hostname was added, `false` if it was already present (or the needle
    /// is empty).
    pub fn add(&mut self, trie: &mut TrieRef) -> bool {
        let mut k = self.buf[NEEDLE_LEN_OFF] as u32;
        if k == 0 {
            return false;
        }
        // restore headroom before any mutation
        if self.char0() - self.trie1() < CELL_RESERVE
            || self.buf.len() as u32 - self.char1() < TAIL_RESERVE
        {
            self.grow_buf();
        }
        let mut icell = trie.iroot;
        // a virgin root becomes the first segment cell directly
        if self.seg_of(icell) == 0 && self.right_of(icell) == 0 && self.down_of(icell) == 0 {
            let seg = self.alloc_segment(k);
            self.set_seg(icell, seg);
            trie.size += 1;
            return true;
        }
        loop {
            let vseg = self.seg_of(icell);
            // boundary cells mark shorter hostnames already stored; pass through
            if vseg == 0 {
                icell = self.right_of(icell);
                continue;
            }
            let len = vseg >> 24;
            let off = vseg & SEG_OFF_MASK;
            let p = self.char0() + off;
            // the first segment byte decides the branch
            if self.buf[p as usize] != self.buf[(k - 1) as usize] {
                let idown = self.down_of(icell);
                if idown != 0 {
                    icell = idown;
                    continue;
                }
                let seg = self.alloc_segment(k);
                let inew = self.alloc_cell(0, 0, seg);
                self.set_down(icell, inew);
                trie.size += 1;
                return true;
            }
            // longest matching prefix of the segment, consuming needle bytes
            // right to left
            let mut m = 1;
            k -= 1;
            while m < len && k > 0 && self.buf[(p + m) as usize] == self.buf[(k - 1) as usize] {
                m += 1;
                k -= 1;
            }
            if m == len {
                let inext = self.right_of(icell);
                if k == 0 {
                    // end of branch, or a boundary cell already in place:
                    // the hostname is stored
                    if inext == 0 || self.seg_of(inext) == 0 {
                        return false;
                    }
                    let ibound = self.alloc_cell(0, inext, 0);
                    self.set_right(icell, ibound);
                } else {
                    if inext != 0 {
                        icell = inext;
                        continue;
                    }
                    // the stored hostname ends here; chain a boundary cell
                    // and a cell for the needle remainder
                    let ibound = self.alloc_cell(0, 0, 0);
                    self.set_right(icell, ibound);
                    let seg = self.alloc_segment(k);
                    let itail = self.alloc_cell(0, 0, seg);
                    self.set_right(ibound, itail);
                }
            } else {
                // split: icell keeps the matched prefix, the tail cell takes
                // over the remainder of the segment by offset arithmetic
                self.set_seg(icell, (m << 24) | off);
                let itail =
                    self.alloc_cell(0, self.right_of(icell), ((len - m) << 24) | (off + m));
                self.set_right(icell, itail);
                if k == 0 {
                    let ibound = self.alloc_cell(0, itail, 0);
                    self.set_right(icell, ibound);
                } else {
                    let seg = self.alloc_segment(k);
                    let ifork = self.alloc_cell(0, 0, seg);
                    self.set_down(itail, ifork);
                }
            }
            trie.size += 1;
            return true;
        }
    }

    /// Set the needle and insert in one call.
    pub fn add_hostname(&mut self, trie: &mut TrieRef, hostname: &str) -> bool {
        self.set_needle(hostname);
        self.add(trie)
    }

    /// Match the current needle against the given trie using the backend
    /// selected at startup.
    ///
    /// Returns the byte offset into the needle where the matched stored
    /// hostname begins (0 for an exact match), or −1 on miss. A returned
    /// offset `k > 0` always has `needle[k - 1] == '.'`.
    pub fn matches(&self, trie: &TrieRef) -> i32 {
        self.matches_with(matcher::active(), trie)
    }

    /// Match with an explicit backend; both backends are interchangeable on
    /// the same buffer.
    pub fn matches_with(&self, backend: MatcherKind, trie: &TrieRef) -> i32 {
        // a reference from another container (or from before a reset) may
        // not name a cell here; treat it as an empty trie
        if !self.contains_cell(trie.iroot) {
            return -1;
        }
        backend.run(&self.buf, trie.iroot)
    }

    /// Set the needle and match in one call.
    pub fn matches_hostname(&mut self, trie: &TrieRef, hostname: &str) -> i32 {
        self.set_needle(hostname);
        self.matches(trie)
    }

    /// Iterate the hostnames stored in the given trie.
    pub fn iter(&self, trie: &TrieRef) -> TrieIter<'_> {
        TrieIter::new(self, trie.iroot)
    }

    /// Compact the buffer: the free gap between arena and pool shrinks to
    /// the cell headroom and the tail to one needle reserve. The dedup map
    /// is discarded and the needle scratch is cleared, so equal hostname
    /// sets serialise to equal buffers no matter what was queried last.
    /// Returns the compacted layout.
    pub fn optimize(&mut self) -> TrieLayout {
        self.dedup = None;
        self.buf[..=NEEDLE_LEN_OFF].fill(0);
        let new_char0 = self.trie1() + CELL_RESERVE;
        let new_char1 = new_char0 + (self.char1() - self.char0());
        self.resize_buf((new_char1 + TAIL_RESERVE) as usize, new_char0);
        TrieLayout {
            byte_length: self.buf.len(),
            char0: self.char0(),
        }
    }

    /// Drop all tries and segments without releasing the buffer. Previously
    /// created [`TrieRef`]s are invalidated.
    pub fn reset(&mut self) {
        self.set_u32(TRIE1_SLOT, TRIE0_OFF);
        let char0 = self.char0();
        self.set_u32(CHAR1_SLOT, char0);
        self.buf[NEEDLE_LEN_OFF] = 0;
        self.dedup = Some(HashMap::new());
    }

    /// The serialised form: the whole buffer, little-endian, self-relative.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the container, yielding the buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Total buffer length in bytes.
    pub fn byte_len(&self) -> usize {
        self.buf.len()
    }

    /// Number of allocated cells across all tries.
    pub fn num_cells(&self) -> usize {
        ((self.trie1() - TRIE0_OFF) / CELL_BYTES) as usize
    }

    /// Bytes currently used by the character-segment pool.
    pub fn pool_bytes(&self) -> usize {
        (self.char1() - self.char0()) as usize
    }

    // ---- buffer primitives ----

    pub(crate) fn buf(&self) -> &[u8] {
        &self.buf
    }

    /// True when the word index names an allocated cell start.
    fn contains_cell(&self, icell: u32) -> bool {
        let byte = icell.checked_mul(4).unwrap_or(u32::MAX);
        byte >= TRIE0_OFF && byte < self.trie1() && (byte - TRIE0_OFF) % CELL_BYTES == 0
    }

    #[inline]
    fn get_u32(&self, off: usize) -> u32 {
        read_u32(&self.buf, off)
    }

    #[inline]
    fn set_u32(&mut self, off: usize, v: u32) {
        write_u32(&mut self.buf, off, v);
    }

    #[inline]
    fn trie1(&self) -> u32 {
        self.get_u32(TRIE1_SLOT)
    }

    #[inline]
    pub(crate) fn char0(&self) -> u32 {
        self.get_u32(CHAR0_SLOT)
    }

    #[inline]
    fn char1(&self) -> u32 {
        self.get_u32(CHAR1_SLOT)
    }

    #[inline]
    pub(crate) fn down_of(&self, icell: u32) -> u32 {
        self.get_u32(icell as usize * 4)
    }

    #[inline]
    pub(crate) fn right_of(&self, icell: u32) -> u32 {
        self.get_u32(icell as usize * 4 + 4)
    }

    #[inline]
    pub(crate) fn seg_of(&self, icell: u32) -> u32 {
        self.get_u32(icell as usize * 4 + 8)
    }

    #[inline]
    fn set_down(&mut self, icell: u32, v: u32) {
        self.set_u32(icell as usize * 4, v);
    }

    #[inline]
    fn set_right(&mut self, icell: u32, v: u32) {
        self.set_u32(icell as usize * 4 + 4, v);
    }

    #[inline]
    fn set_seg(&mut self, icell: u32, v: u32) {
        self.set_u32(icell as usize * 4 + 8, v);
    }

    // ---- allocators ----

    /// Append a 12-byte cell at the arena end; returns its word index.
    /// Callers keep the `CELL_RESERVE` headroom, so the arena never collides
    /// with the pool mid-insertion.
    fn alloc_cell(&mut self, down: u32, right: u32, seg: u32) -> u32 {
        let trie1 = self.trie1();
        self.set_u32(trie1 as usize, down);
        self.set_u32(trie1 as usize + 4, right);
        self.set_u32(trie1 as usize + 8, seg);
        self.set_u32(TRIE1_SLOT, trie1 + CELL_BYTES);
        trie1 / 4
    }

    /// Append the first `len` needle bytes to the pool in reverse order and
    /// return the packed `(len << 24) | off` descriptor. Identical segments
    /// are shared through the construction-only dedup map.
    fn alloc_segment(&mut self, len: u32) -> u32 {
        if len == 0 {
            return 0;
        }
        let hit = self
            .dedup
            .as_ref()
            .and_then(|map| map.get(&self.buf[..len as usize]).copied());
        if let Some(off) = hit {
            return (len << 24) | off;
        }
        let char1 = self.char1();
        let off = char1 - self.char0();
        debug_assert!(off + len <= SEG_OFF_MASK);
        for i in 0..len {
            self.buf[(char1 + i) as usize] = self.buf[(len - 1 - i) as usize];
        }
        self.set_u32(CHAR1_SLOT, char1 + len);
        if self.dedup.is_some() {
            let key: Box<[u8]> = self.buf[..len as usize].into();
            if let Some(map) = self.dedup.as_mut() {
                map.insert(key, off);
            }
        }
        (len << 24) | off
    }

    // ---- growth ----

    /// Enlarge the buffer in 64 KiB pages, relocating the pool upward so
    /// the arena regains its headroom. Pool offsets are relative to CHAR0,
    /// so no cell needs fixing up.
    fn grow_buf(&mut self) {
        let new_char0 = round_up(self.trie1() + CELL_RESERVE, PAGE_SIZE).max(self.char0());
        let new_char1 = new_char0 + (self.char1() - self.char0());
        let new_len = (round_up(new_char1 + TAIL_RESERVE, PAGE_SIZE) as usize).max(self.buf.len());
        self.resize_buf(new_len, new_char0);
    }

    fn resize_buf(&mut self, new_len: usize, new_char0: u32) {
        let old_char0 = self.char0();
        let old_char1 = self.char1();
        let pool_len = old_char1 - old_char0;
        if new_len > self.buf.len() {
            self.buf.resize(new_len, 0);
        }
        if new_char0 != old_char0 {
            self.buf
                .copy_within(old_char0 as usize..old_char1 as usize, new_char0 as usize);
            self.set_u32(CHAR0_SLOT, new_char0);
            self.set_u32(CHAR1_SLOT, new_char0 + pool_len);
        }
        if new_len < self.buf.len() {
            self.buf.truncate(new_len);
        }
        // keep the free regions zeroed so equal insertion sequences produce
        // equal buffers
        let trie1 = self.trie1() as usize;
        let char0 = self.char0() as usize;
        let char1 = self.char1() as usize;
        self.buf[trie1..char0].fill(0);
        self.buf[char1..].fill(0);
    }
}

impl Default for TrieContainer {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
pub(crate) fn read_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

#[inline]
fn write_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}
