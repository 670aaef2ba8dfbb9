//! Transport-layer tags carried by packets.

/// TCP segment (minimal fields for simulation).
///
/// Sequence numbers count payload bytes from zero; the handshake does not
/// consume sequence space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpSegment {
    /// Connection request from a generator.
    Syn,
    /// Listener accepted the connection.
    SynAck,
    /// No listener on the destination port.
    Rst,
    /// Data segment: `seq` is byte sequence number, `len` is payload bytes.
    Data { seq: u64, len: u32 },
    /// Cumulative ACK: `ack` is the next expected byte.
    Ack { ack: u64 },
}

impl TcpSegment {
    pub fn payload_len(&self) -> u32 {
        match self {
            TcpSegment::Data { len, .. } => *len,
            _ => 0,
        }
    }
}
