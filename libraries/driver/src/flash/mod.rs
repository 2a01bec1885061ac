// SPI NOR flash
pub mod w25q;

pub use self::w25q::{W25q, W25qError};
