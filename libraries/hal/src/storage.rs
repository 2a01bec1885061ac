//! Non-volatile storage interface

/// External flash chip. Only its identity is checked at startup.
pub trait FlashMemory {
    type Error: core::fmt::Debug;

    /// Wake the chip and verify it reports the expected identifiers
    async fn init(&mut self) -> Result<(), Self::Error>;
}
