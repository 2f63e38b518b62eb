use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits. Every world
/// coordinate and distance on the board is stored in this type so probes
/// and snapping are bit-for-bit reproducible.
pub type Fixed64 = I32F32;

/// Convert an f64 to Fixed64. Use only for initialization, never in the
/// drag loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and logging.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Round to the nearest integer, ties away from zero. Saturates at the
/// ends of the range instead of overflowing.
#[inline]
pub fn round_to_i32(v: Fixed64) -> i32 {
    v.saturating_round().saturating_to_num::<i32>()
}

/// Checked division for Fixed64 that returns None on a zero divisor or
/// overflow.
#[inline]
pub fn checked_div_64(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    a.checked_div(b)
}
