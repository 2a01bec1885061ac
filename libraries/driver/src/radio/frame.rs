//! Packet layout shared by RadioHead-compatible LoRa links.

use heapless::Vec;

/// Header bytes in front of every payload
pub const HEADER_LEN: usize = 4;

/// Largest frame the 8-bit payload length register can describe
pub const MAX_FRAME_LEN: usize = 255;

/// Largest caller payload that fits behind the header
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - HEADER_LEN;

/// Addressing header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub to: u8,
    pub from: u8,
    pub id: u8,
    pub flags: u8,
}

impl PacketHeader {
    /// Broadcast from and to any node, no id, no flags
    pub const BROADCAST: Self = Self {
        to: 0xFF,
        from: 0xFF,
        id: 0x00,
        flags: 0x00,
    };

    pub const fn to_bytes(self) -> [u8; HEADER_LEN] {
        [self.to, self.from, self.id, self.flags]
    }
}

impl Default for PacketHeader {
    fn default() -> Self {
        Self::BROADCAST
    }
}

/// Header followed by payload, as staged in the radio FIFO
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketFrame {
    bytes: Vec<u8, MAX_FRAME_LEN>,
}

impl PacketFrame {
    /// Build a frame, `None` if the payload does not fit
    pub fn new(header: PacketHeader, payload: &[u8]) -> Option<Self> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return None;
        }

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&header.to_bytes()).ok()?;
        bytes.extend_from_slice(payload).ok()?;
        Some(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Value for the payload length register
    pub fn length(&self) -> u8 {
        // bounded by MAX_FRAME_LEN
        self.bytes.len() as u8
    }
}
