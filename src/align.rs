/// Padding needed after `position` to reach the next multiple of `alignment`.
///
/// `alignment` of zero disables alignment, the result is then always zero.
/// Otherwise the result is less than `alignment` and zero whenever `position`
/// already is a multiple.
pub(crate) fn padding_to_align(position: u64, alignment: u16) -> u16 {
    if alignment == 0 {
        return 0;
    }

    let alignment = u64::from(alignment);
    let remainder = position % alignment;
    if remainder == 0 {
        0
    } else {
        (alignment - remainder) as u16
    }
}
