// LoRa packet radios
pub mod frame;
pub mod rfm9x;

pub use self::frame::{PacketFrame, PacketHeader, HEADER_LEN, MAX_PAYLOAD_LEN};
pub use self::rfm9x::{frequency_word, Rfm9x, Rfm9xConfig, Rfm9xError, RadioMode};
