//! Portable matcher: bounds-checked right-to-left traversal.

use crate::container::{read_u32, CHAR0_SLOT, NEEDLE_LEN_OFF, SEG_OFF_MASK};

/// Match the needle in `buf[0..255]` against the trie rooted at word index
/// `iroot`. Returns the needle offset where the matched stored hostname
/// begins, or −1.
///
/// The traversal prefers the deepest stored suffix: when a boundary cell is
/// reached at a label boundary with needle bytes left, the offset is
/// recorded and the descent continues; a later miss falls back to it.
pub(crate) fn matches(buf: &[u8], iroot: u32) -> i32 {
    let char0 = read_u32(buf, CHAR0_SLOT) as usize;
    let mut k = buf[NEEDLE_LEN_OFF] as usize;
    let mut icell = iroot as usize;
    let mut found = -1i32;
    loop {
        // needle exhausted inside a branch
        if k == 0 {
            return found;
        }
        let c = buf[k - 1];
        // walk the down chain for a segment starting with this byte
        let (len, off) = loop {
            let vseg = read_u32(buf, icell * 4 + 8);
            if vseg != 0 {
                let off = (vseg & SEG_OFF_MASK) as usize;
                if buf[char0 + off] == c {
                    break ((vseg >> 24) as usize, off);
                }
            }
            icell = read_u32(buf, icell * 4) as usize;
            if icell == 0 {
                return found;
            }
        };
        // the rest of the segment must match the needle right to left
        if len > k {
            return found;
        }
        for i in 1..len {
            if buf[char0 + off + i] != buf[k - 1 - i] {
                return found;
            }
        }
        k -= len;
        icell = read_u32(buf, icell * 4 + 4) as usize;
        if icell == 0 {
            // branch end acts as an implicit hostname terminator
            return if k == 0 || buf[k - 1] == b'.' {
                k as i32
            } else {
                found
            };
        }
        if read_u32(buf, icell * 4 + 8) == 0 {
            // boundary cell: everything consumed so far is a stored hostname
            if k == 0 {
                return 0;
            }
            if buf[k - 1] == b'.' {
                found = k as i32;
            }
            icell = read_u32(buf, icell * 4 + 4) as usize;
            if icell == 0 {
                return found;
            }
        }
    }
}
