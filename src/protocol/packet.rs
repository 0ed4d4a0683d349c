//! # Packet Constants and Types
//!
//! Wire layout of one framed NXT log packet:
//!
//! ```text
//! +-------------------+---------------------------+
//! | length (2, LE)    | payload (32)              |
//! +-------------------+---------------------------+
//! ```
//!
//! The length field must equal [`PACKET_PAYLOAD_LEN`] for the packet to be accepted.

/// Length header size in bytes
pub const PACKET_HEADER_LEN: usize = 2;

/// Telemetry payload size in bytes
pub const PACKET_PAYLOAD_LEN: usize = 32;

/// Total framed packet size (header + payload)
pub const PACKET_LEN: usize = PACKET_HEADER_LEN + PACKET_PAYLOAD_LEN;

/// Payload byte offsets
pub const OFFSET_SYS_TICK: usize = 0;
pub const OFFSET_DATA_LEFT: usize = 4;
pub const OFFSET_DATA_RIGHT: usize = 5;
pub const OFFSET_BATTERY: usize = 6;
pub const OFFSET_MOTOR_COUNT: usize = 8;
pub const OFFSET_ADC: usize = 20;
pub const OFFSET_I2C: usize = 28;

/// Number of motor encoder channels (tail, right wheel, left wheel)
pub const MOTOR_CHANNELS: usize = 3;

/// Number of A/D sensor channels (channel 0 is the gyro)
pub const ADC_CHANNELS: usize = 4;

/// Motor channel carrying the tail encoder
pub const MOTOR_TAIL: usize = 0;
/// Motor channel carrying the right wheel encoder
pub const MOTOR_RIGHT: usize = 1;
/// Motor channel carrying the left wheel encoder
pub const MOTOR_LEFT: usize = 2;

/// A/D channel carrying the gyro sensor
pub const ADC_GYRO: usize = 0;

/// One validated telemetry payload
pub type Payload = [u8; PACKET_PAYLOAD_LEN];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_sizes() {
        assert_eq!(PACKET_HEADER_LEN, 2);
        assert_eq!(PACKET_PAYLOAD_LEN, 32);
        assert_eq!(PACKET_LEN, 34);
    }

    #[test]
    fn test_layout_is_contiguous() {
        assert_eq!(OFFSET_DATA_LEFT, OFFSET_SYS_TICK + 4);
        assert_eq!(OFFSET_BATTERY, OFFSET_DATA_RIGHT + 1);
        assert_eq!(OFFSET_ADC, OFFSET_MOTOR_COUNT + 4 * MOTOR_CHANNELS);
        assert_eq!(OFFSET_I2C, OFFSET_ADC + 2 * ADC_CHANNELS);
        assert_eq!(OFFSET_I2C + 4, PACKET_PAYLOAD_LEN);
    }
}
