//! Test doubles for the embedded-hal traits the drivers are generic over.

use std::collections::VecDeque;

use core::convert::Infallible;
use embedded_hal::spi::{Error, ErrorKind, ErrorType};
use embedded_hal_async::spi::{Operation, SpiDevice};

/// One operation inside a recorded SPI transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Write(Vec<u8>),
    Read(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

impl Error for MockError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// SPI device that records every transaction and answers reads from a queue
///
/// Reads beyond the queued responses return zeros.
#[derive(Debug, Default)]
pub struct MockSpi {
    pub transactions: Vec<Vec<Op>>,
    responses: VecDeque<Vec<u8>>,
    failing: bool,
}

impl MockSpi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the bytes returned by the next read operation
    pub fn respond(&mut self, bytes: &[u8]) -> &mut Self {
        self.responses.push_back(bytes.to_vec());
        self
    }

    /// Make every following transaction fail
    pub fn fail(&mut self) {
        self.failing = true;
    }

    /// Transactions that only write, i.e. register writes
    pub fn register_writes(&self) -> Vec<Vec<u8>> {
        self.transactions
            .iter()
            .filter(|ops| ops.iter().all(|op| matches!(op, Op::Write(_))))
            .filter_map(|ops| match ops.first() {
                Some(Op::Write(bytes)) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// Address bytes of transactions that contain a read
    pub fn read_addresses(&self) -> Vec<u8> {
        self.transactions
            .iter()
            .filter(|ops| ops.iter().any(|op| matches!(op, Op::Read(_))))
            .filter_map(|ops| match ops.first() {
                Some(Op::Write(bytes)) => bytes.first().copied(),
                _ => None,
            })
            .collect()
    }
}

impl ErrorType for MockSpi {
    type Error = MockError;
}

impl SpiDevice for MockSpi {
    async fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), MockError> {
        if self.failing {
            return Err(MockError);
        }

        let mut recorded = Vec::new();
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => recorded.push(Op::Write(bytes.to_vec())),
                Operation::Read(buf) => {
                    let response = self.responses.pop_front().unwrap_or_default();
                    for (i, byte) in buf.iter_mut().enumerate() {
                        *byte = response.get(i).copied().unwrap_or(0);
                    }
                    recorded.push(Op::Read(buf.len()));
                }
                Operation::Transfer(..) | Operation::TransferInPlace(..) => {
                    panic!("full-duplex transfers are not used by these drivers")
                }
                Operation::DelayNs(_) => {}
            }
        }
        self.transactions.push(recorded);
        Ok(())
    }
}

/// Delay that only accumulates the requested time
#[derive(Debug, Default)]
pub struct MockDelay {
    pub elapsed_ns: u64,
}

impl MockDelay {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl embedded_hal_async::delay::DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }
}

/// Output pin remembering every level it was driven to
#[derive(Debug, Default)]
pub struct MockPin {
    pub levels: Vec<bool>,
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.levels.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.levels.push(true);
        Ok(())
    }
}
