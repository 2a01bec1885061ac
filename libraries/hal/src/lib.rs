#![no_std]
#![allow(async_fn_in_trait)]

mod baro;
mod power;
mod radio;
mod storage;

pub use baro::*;
pub use power::*;
pub use radio::*;
pub use storage::*;
