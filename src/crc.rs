//! CRC-16/MODBUS engine.
//!
//! Polynomial 0x8005 processed reflected (0xA001), initial value 0xFFFF,
//! reflected output and no final XOR.

/// Reflected form of the 0x8005 polynomial
const POLY_REFLECTED: u16 = 0xA001;

/// Initial remainder of every independent checksum
pub const CRC16_INIT: u16 = 0xFFFF;

/// Lookup table for CRC-16/MODBUS, built at compile time
pub const CRC16_MODBUS_TABLE: [u16; 256] = make_table();

const fn make_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLY_REFLECTED
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Folds `data` into the running remainder `crc`, one byte per table lookup.
///
/// Empty input returns `crc` unchanged.
pub fn update(data: &[u8], crc: u16) -> u16 {
    data.iter().fold(crc, |crc, &byte| {
        let index = ((crc ^ byte as u16) & 0xFF) as usize;
        CRC16_MODBUS_TABLE[index] ^ (crc >> 8)
    })
}

/// CRC-16/MODBUS of `data`
///
/// Same as [`update`] starting from [`CRC16_INIT`]
pub fn checksum(data: &[u8]) -> u16 {
    update(data, CRC16_INIT)
}
