/// Packet radio interface
pub trait PacketRadio {
    type Error: core::fmt::Debug;

    /// Bring the radio out of reset and apply its one-time configuration
    async fn init(&mut self) -> Result<(), Self::Error>;

    /// Frame `payload` and start transmitting it
    ///
    /// Returns once transmission has been triggered, not when it completes.
    async fn send(&mut self, payload: &[u8]) -> Result<(), Self::Error>;
}
