/// Nibble lookup table for the reflected ZIP polynomial 0xedb88320.
const CRC32_TABLE: [u32; 16] = {
    let mut table = [0u32; 16];
    let mut i = 0;
    while i < 16 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 4 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xedb88320
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// CRC-32 of empty data, the seed for the first `update` call.
pub(crate) const CRC32_INIT: u32 = 0;

/// Folds `data` into a running CRC-32.
///
/// The accumulator is complemented on entry and on exit, so every returned
/// value is a valid ZIP CRC of the data seen so far and the calculation can
/// be resumed with arbitrarily split chunks.
pub(crate) fn update(crc: u32, data: &[u8]) -> u32 {
    let mut crc = !crc;
    for &byte in data {
        crc = (crc >> 4) ^ CRC32_TABLE[((crc ^ u32::from(byte)) & 0xf) as usize];
        crc = (crc >> 4) ^ CRC32_TABLE[((crc ^ (u32::from(byte) >> 4)) & 0xf) as usize];
    }
    !crc
}
