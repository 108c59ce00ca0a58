//! Accelerated matcher: unchecked word loads over the same buffer image.
//!
//! The traversal is byte-for-byte identical to the scalar backend; the only
//! difference is that cell words are read as native u32 loads and byte
//! accesses skip bounds checks. Native loads make the backend little-endian
//! only, which is why it sits behind the startup probe in `matcher::active`.

use crate::container::{CHAR0_SLOT, NEEDLE_LEN_OFF, SEG_OFF_MASK};

/// See `scalar::matches` for the contract; both backends are
/// interchangeable on the same buffer.
pub(crate) fn matches(buf: &[u8], iroot: u32) -> i32 {
    // SAFETY: the buffer was either produced by TrieContainer mutations or
    // accepted by TrieContainer::from_bytes, both of which guarantee that
    // every reachable cell index and segment descriptor stays inside the
    // buffer and that the needle length byte is at most 254.
    unsafe {
        let p = buf.as_ptr();
        let char0 = word(p, CHAR0_SLOT) as usize;
        let mut k = *p.add(NEEDLE_LEN_OFF) as usize;
        let mut icell = iroot as usize;
        let mut found = -1i32;
        loop {
            if k == 0 {
                return found;
            }
            let c = *p.add(k - 1);
            let (len, off) = loop {
                let vseg = word(p, icell * 4 + 8);
                if vseg != 0 {
                    let off = (vseg & SEG_OFF_MASK) as usize;
                    if *p.add(char0 + off) == c {
                        break ((vseg >> 24) as usize, off);
                    }
                }
                icell = word(p, icell * 4) as usize;
                if icell == 0 {
                    return found;
                }
            };
            if len > k {
                return found;
            }
            for i in 1..len {
                if *p.add(char0 + off + i) != *p.add(k - 1 - i) {
                    return found;
                }
            }
            k -= len;
            icell = word(p, icell * 4 + 4) as usize;
            if icell == 0 {
                return if k == 0 || *p.add(k - 1) == b'.' {
                    k as i32
                } else {
                    found
                };
            }
            if word(p, icell * 4 + 8) == 0 {
                if k == 0 {
                    return 0;
                }
                if *p.add(k - 1) == b'.' {
                    found = k as i32;
                }
                icell = word(p, icell * 4 + 4) as usize;
                if icell == 0 {
                    return found;
                }
            }
        }
    }
}

/// Unaligned native-endian u32 load; the buffer is little-endian by
/// construction, so this is only correct on little-endian hosts.
#[inline(always)]
unsafe fn word(p: *const u8, byte_off: usize) -> u32 {
    (p.add(byte_off) as *const u32).read_unaligned()
}
