//! Trait for trie key types (u32 for IPv4, u128 for IPv6).

use std::fmt::{Debug, LowerHex};

/// Unsigned integer address used as a bit-trie key.
///
/// Bits are consumed most-significant first, so bit index 0 is the first
/// bit of the network prefix.
pub trait PrefixKey: Copy + Eq + Ord + Debug + LowerHex + Send + Sync + 'static {
    /// Address width in bits (32 or 128).
    const WIDTH: u8;

    /// Bit at `index` (0 = MSB), as 0 or 1.
    fn bit(self, index: u8) -> usize;

    /// Network mask with the top `prefix_len` bits set.
    fn mask(prefix_len: u8) -> Self;

    /// Zero every bit past `prefix_len`.
    fn canonical(self, prefix_len: u8) -> Self;

    /// Set every bit past `prefix_len`.
    fn fill_host(self, prefix_len: u8) -> Self;
}

macro_rules! impl_prefix_key {
    ($t:ty) => {
        impl PrefixKey for $t {
            const WIDTH: u8 = <$t>::BITS as u8;

            #[inline]
            fn bit(self, index: u8) -> usize {
                debug_assert!(index < Self::WIDTH);
                ((self >> (Self::WIDTH - 1 - index)) & 1) as usize
            }

            #[inline]
            fn mask(prefix_len: u8) -> Self {
                if prefix_len == 0 {
                    0
                } else if prefix_len >= Self::WIDTH {
                    !0
                } else {
                    let all: Self = !0;
                    !(all >> prefix_len)
                }
            }

            #[inline(always)]
            fn canonical(self, prefix_len: u8) -> Self {
                self & Self::mask(prefix_len)
            }

            #[inline(always)]
            fn fill_host(self, prefix_len: u8) -> Self {
                self | !Self::mask(prefix_len)
            }
        }
    };
}

impl_prefix_key!(u32);
impl_prefix_key!(u128);
