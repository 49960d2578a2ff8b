pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Premultiplied source over straight destination, both expressed per channel.
///
/// `src_c` is already multiplied by `src_a`.
pub(crate) fn over_channel(src_c: u8, src_a: u8, dst_c: u8) -> u8 {
    let inv = 255u16 - u16::from(src_a);
    (u16::from(src_c) + mul_div255_u16(u16::from(dst_c), inv)).min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
