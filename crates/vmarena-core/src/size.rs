//! Byte-size helpers and rounding.

/// `n` kibibytes in bytes.
pub const fn kib(n: usize) -> usize {
    n << 10
}

/// `n` mebibytes in bytes.
pub const fn mib(n: usize) -> usize {
    n << 20
}

/// `n` gibibytes in bytes.
pub const fn gib(n: usize) -> usize {
    n << 30
}

/// Round `value` up to the next multiple of `align`.
///
/// `align` must be a non-zero power of two. Returns `None` if the result
/// would not fit in a `usize`.
pub const fn align_up_pow2(value: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    let mask = align - 1;
    match value.checked_add(mask) {
        Some(bumped) => Some(bumped & !mask),
        None => None,
    }
}

/// Round `value` up to the next multiple of `step`, which must be non-zero.
///
/// Unlike [`align_up_pow2`] this accepts any step, such as a commit size of
/// three pages. Returns `None` if the result would not fit in a `usize`.
pub const fn align_up(value: usize, step: usize) -> Option<usize> {
    debug_assert!(step != 0);
    match value % step {
        0 => Some(value),
        rem => value.checked_add(step - rem),
    }
}
