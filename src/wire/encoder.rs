//! # Reading Encoder
//!
//! Encodes sensor readings into their fixed binary payloads.
//!
//! Both encodings are documented here precisely enough for an independent
//! decoder; see the layout tables below. Encoded length is a pure function
//! of `(SensorKind, WireFormat)` and never varies with field values. The
//! zero-length payload is reserved as the "trajectory complete" sentinel
//! and is never produced by these encoders.
//!
//! ## Flat layout
//!
//! Little-endian IEEE-754 f32 fields, packed back to back in the order
//! given by [`SensorKind::field_names`], no header or trailer:
//!
//! | Kind       | Fields                                             | Bytes |
//! |------------|----------------------------------------------------|-------|
//! | imu        | acceleration x, y, z                               | 12    |
//! | gyro       | omega x, y, z                                      | 12    |
//! | altitude   | altitude                                           | 4     |
//! | kinematics | position xyz, velocity xyz, acceleration xyz       | 36    |
//!
//! ## Framed layout
//!
//! A self-describing frame in the shape `sync + length + tag + records +
//! crc`:
//!
//! | Offset | Width | Content                                          |
//! |--------|-------|--------------------------------------------------|
//! | 0      | 1     | sync byte (0xA5)                                 |
//! | 1      | 1     | length = bytes of tag + records + crc            |
//! | 2      | 1     | sensor tag ([`SensorKind::wire_tag`])            |
//! | 3      | ...   | vector-group records in wire order               |
//! | last   | 1     | CRC-8 (poly 0xD5) over length + tag + records    |
//!
//! Each vector-group record is `group id (1) + component count (1) +
//! count × f32 LE`. The 3-component record is reused for position,
//! velocity, acceleration and angular rate; altitude is a 1-component
//! record.

use super::protocol::{
    Reading, SensorKind, WireFormat, FIELD_WIDTH, FRAME_OVERHEAD, FRAME_SYNC_BYTE,
    GROUP_HEADER_SIZE,
};

/// CRC-8 polynomial (DVB-S2, x^8 + x^7 + x^6 + x^4 + x^2 + 1)
const CRC8_POLY: u8 = 0xD5;

/// Encoded payload size in bytes for a sensor kind under a wire format.
///
/// Pure function of its arguments; the encoders uphold
/// `encode_reading(r, f).len() == encoded_len(r.kind, f)` for every
/// reading.
pub fn encoded_len(kind: SensorKind, format: WireFormat) -> usize {
    match format {
        WireFormat::Flat => kind.field_count() * FIELD_WIDTH,
        WireFormat::Framed => {
            let records: usize = kind
                .groups()
                .iter()
                .map(|&(_, n)| GROUP_HEADER_SIZE + n * FIELD_WIDTH)
                .sum();
            FRAME_OVERHEAD + records
        }
    }
}

/// Encode a reading into its wire payload.
///
/// # Arguments
///
/// * `reading` - The noisy reading; `values` must be in wire order
/// * `format` - Deployment wire format
///
/// # Returns
///
/// * `Vec<u8>` - Payload of exactly `encoded_len(reading.kind, format)`
///   bytes
pub fn encode_reading(reading: &Reading, format: WireFormat) -> Vec<u8> {
    match format {
        WireFormat::Flat => encode_flat(reading),
        WireFormat::Framed => encode_framed(reading),
    }
}

/// Flat encoding: bare little-endian f32 fields in wire order
fn encode_flat(reading: &Reading) -> Vec<u8> {
    let mut payload = Vec::with_capacity(reading.values.len() * FIELD_WIDTH);
    for value in &reading.values {
        payload.extend_from_slice(&value.to_le_bytes());
    }
    payload
}

/// Framed encoding: sync + length + tag + vector-group records + CRC-8
fn encode_framed(reading: &Reading) -> Vec<u8> {
    let total = encoded_len(reading.kind, WireFormat::Framed);

    // Length counts everything after the length byte itself: tag, records,
    // crc. The CRC is computed over length + tag + records, as framed
    // consumers resynchronize on the sync byte and validate the rest.
    let length = (total - 2) as u8;

    let mut frame = Vec::with_capacity(total);
    frame.push(FRAME_SYNC_BYTE);
    frame.push(length);
    frame.push(reading.kind.wire_tag());

    let mut offset = 0;
    for &(group, count) in reading.kind.groups() {
        frame.push(group.id());
        frame.push(count as u8);
        for value in &reading.values[offset..offset + count] {
            frame.extend_from_slice(&value.to_le_bytes());
        }
        offset += count;
    }

    let crc = crc8(&frame[1..]);
    frame.push(crc);

    frame
}

/// CRC-8 with polynomial 0xD5, initial value 0x00.
///
/// Direct bitwise form; frames here are a few dozen bytes, so a lookup
/// table buys nothing.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;

    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLY
            } else {
                crc << 1
            };
        }
    }

    crc
}
