//! # Payload Encoder
//!
//! Encodes telemetry fields into the wire layout. Used to replay record CSV
//! files through the decoder and to build test streams.

use super::packet::*;
use super::record::TelemetryRecord;

/// Encode a record's fields into a 32-byte payload
///
/// `sys_tick` is written as the device clock; `rel_tick` is derived state and
/// is not part of the wire format.
///
/// # Examples
///
/// ```
/// use nxt_telemetry::protocol::encoder::encode_payload;
/// use nxt_telemetry::protocol::record::TelemetryRecord;
///
/// let record = TelemetryRecord { sys_tick: 1, ..Default::default() };
/// let payload = encode_payload(&record);
/// assert_eq!(&payload[0..4], &[1, 0, 0, 0]);
/// ```
pub fn encode_payload(record: &TelemetryRecord) -> Payload {
    let mut payload = [0u8; PACKET_PAYLOAD_LEN];

    payload[OFFSET_SYS_TICK..OFFSET_SYS_TICK + 4].copy_from_slice(&record.sys_tick.to_le_bytes());
    payload[OFFSET_DATA_LEFT] = record.data_left as u8;
    payload[OFFSET_DATA_RIGHT] = record.data_right as u8;
    payload[OFFSET_BATTERY..OFFSET_BATTERY + 2].copy_from_slice(&record.battery.to_le_bytes());

    for (i, count) in record.motor_count.iter().enumerate() {
        let at = OFFSET_MOTOR_COUNT + 4 * i;
        payload[at..at + 4].copy_from_slice(&count.to_le_bytes());
    }

    for (i, value) in record.adc.iter().enumerate() {
        let at = OFFSET_ADC + 2 * i;
        payload[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    payload[OFFSET_I2C..OFFSET_I2C + 4].copy_from_slice(&record.i2c.to_le_bytes());

    payload
}

/// Encode a record into a complete framed packet (length header + payload)
pub fn encode_packet(record: &TelemetryRecord) -> Vec<u8> {
    let mut packet = Vec::with_capacity(PACKET_LEN);
    packet.extend_from_slice(&(PACKET_PAYLOAD_LEN as u16).to_le_bytes());
    packet.extend_from_slice(&encode_payload(record));
    packet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::framer::PacketFramer;

    #[test]
    fn test_encode_packet_length() {
        let packet = encode_packet(&TelemetryRecord::default());
        assert_eq!(packet.len(), PACKET_LEN);
        assert_eq!(&packet[..2], &[0x20, 0x00]);
    }

    #[test]
    fn test_encode_signed_fields() {
        let record = TelemetryRecord {
            data_left: -1,
            motor_count: [-1, 0, 0],
            adc: [0, 0, 0, -2],
            ..Default::default()
        };
        let payload = encode_payload(&record);

        assert_eq!(payload[OFFSET_DATA_LEFT], 0xFF);
        assert_eq!(&payload[OFFSET_MOTOR_COUNT..OFFSET_MOTOR_COUNT + 4], &[0xFF; 4]);
        assert_eq!(&payload[OFFSET_ADC + 6..OFFSET_ADC + 8], &[0xFE, 0xFF]);
    }

    #[test]
    fn test_encoded_packet_passes_framer() {
        let record = TelemetryRecord { sys_tick: 77, battery: 8000, ..Default::default() };
        let mut framer = PacketFramer::new();
        let payloads = framer.feed_slice(&encode_packet(&record));

        assert_eq!(payloads, vec![encode_payload(&record)]);
    }
}
