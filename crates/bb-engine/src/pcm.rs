//! 16-bit PCM arithmetic.

/// Clamp a widened sum back into the i16 range.
#[inline]
pub fn clip16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Mix `src` into the front of `out`, saturating each sum.
///
/// Only `min(out.len(), src.len())` positions are touched.
#[inline]
pub fn mix_into(out: &mut [i16], src: &[i16]) {
    for (acc, &value) in out.iter_mut().zip(src) {
        *acc = clip16(*acc as i32 + value as i32);
    }
}
