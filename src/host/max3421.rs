//! MAX3421E SPI host-controller bridge.
//!
//! The engine's host driver speaks to the MAX3421E through three
//! callbacks: chip select, a full-duplex byte transfer and masking of the
//! controller's interrupt line. [`Max3421Bridge`] implements them over an
//! `embedded-hal` SPI bus and output pin. It keeps no state besides the
//! handles, so the callbacks can run from the interrupt handler.
//!
//! SPI mode 0, MSB first, at most 26 MHz. The bus must be configured
//! accordingly by the caller.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::error::Error;

/// Write flag in the command byte.
pub const CMD_WRITE: u8 = 0x02;

/// Register addresses, pre-shifted into command-byte position.
pub mod reg {
    pub const RCVFIFO: u8 = 1 << 3;
    pub const SNDFIFO: u8 = 2 << 3;
    pub const USBIRQ: u8 = 13 << 3;
    pub const USBIEN: u8 = 14 << 3;
    pub const USBCTL: u8 = 15 << 3;
    pub const CPUCTL: u8 = 16 << 3;
    pub const PINCTL: u8 = 17 << 3;
    pub const REVISION: u8 = 18 << 3;
    pub const IOPINS1: u8 = 20 << 3;
    pub const IOPINS2: u8 = 21 << 3;
    pub const HIRQ: u8 = 25 << 3;
    pub const HIEN: u8 = 26 << 3;
    pub const MODE: u8 = 27 << 3;
}

/// Enable / disable the MCU interrupt wired to the controller's INT pin.
///
/// `embedded-hal` has no interrupt abstraction, so the platform provides
/// this (typically an NVIC or GPIO-edge mask).
pub trait InterruptLine {
    fn set_enabled(&mut self, enabled: bool);
}

pub struct Max3421Bridge<SPI, CS, IRQ> {
    spi: SPI,
    cs: CS,
    irq: IRQ,
}

impl<SPI, CS, IRQ> Max3421Bridge<SPI, CS, IRQ>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    IRQ: InterruptLine,
{
    /// Take the bus handles and leave the controller deselected.
    pub fn new(spi: SPI, mut cs: CS, irq: IRQ) -> Result<Self, Error> {
        cs.set_high().map_err(|_| Error::Pin)?;
        Ok(Self { spi, cs, irq })
    }

    pub fn release(self) -> (SPI, CS, IRQ) {
        (self.spi, self.cs, self.irq)
    }

    /// Assert (`true`) or release chip select. Pending bus traffic is
    /// flushed before the controller is deselected.
    pub fn chip_select(&mut self, active: bool) -> Result<(), Error> {
        if active {
            self.cs.set_low().map_err(|_| Error::Pin)
        } else {
            self.spi.flush().map_err(|_| Error::Spi)?;
            self.cs.set_high().map_err(|_| Error::Pin)
        }
    }

    /// Clock `len` bytes. A missing `tx` sends zeros; a missing `rx`
    /// discards what comes back.
    pub fn transfer(
        &mut self,
        tx: Option<&[u8]>,
        rx: Option<&mut [u8]>,
        len: usize,
    ) -> Result<(), Error> {
        if tx.is_some_and(|t| t.len() < len) || rx.as_ref().is_some_and(|r| r.len() < len) {
            return Err(Error::InvalidArgument);
        }

        let result = match (tx, rx) {
            (Some(tx), Some(rx)) => self.spi.transfer(&mut rx[..len], &tx[..len]),
            (Some(tx), None) => self.spi.write(&tx[..len]),
            (None, Some(rx)) => {
                let rx = &mut rx[..len];
                rx.fill(0);
                self.spi.transfer_in_place(rx)
            }
            (None, None) => {
                let mut result = Ok(());
                for _ in 0..len {
                    result = self.spi.write(&[0]);
                    if result.is_err() {
                        break;
                    }
                }
                result
            }
        };
        result.map_err(|_| Error::Spi)
    }

    pub fn set_interrupt_enabled(&mut self, enabled: bool) {
        self.irq.set_enabled(enabled);
    }

    // Register access

    pub fn read_register(&mut self, addr: u8) -> Result<u8, Error> {
        let tx = [addr & !CMD_WRITE, 0];
        let mut rx = [0u8; 2];
        self.framed(Some(&tx[..]), Some(&mut rx[..]))?;
        Ok(rx[1])
    }

    pub fn write_register(&mut self, addr: u8, value: u8) -> Result<(), Error> {
        trace!("max3421 write {} = {}", addr >> 3, value);
        let tx = [addr | CMD_WRITE, value];
        self.framed(Some(&tx[..]), None)
    }

    /// GPOUT0-3 (low nibble of IOPINS1).
    pub fn write_iopins1(&mut self, value: u8) -> Result<(), Error> {
        self.write_register(reg::IOPINS1, value)
    }

    /// GPOUT4-7 (low nibble of IOPINS2).
    pub fn write_iopins2(&mut self, value: u8) -> Result<(), Error> {
        self.write_register(reg::IOPINS2, value)
    }

    /// Silicon revision, 0x12 or 0x13 on a healthy part.
    pub fn revision(&mut self) -> Result<u8, Error> {
        self.read_register(reg::REVISION)
    }

    /// One chip-select bracketed transaction. Chip select is released
    /// even when the transfer fails.
    fn framed(&mut self, tx: Option<&[u8]>, rx: Option<&mut [u8]>) -> Result<(), Error> {
        let len = tx.map_or(0, <[u8]>::len);
        self.chip_select(true)?;
        let result = self.transfer(tx, rx, len);
        let released = self.chip_select(false);
        result.and(released)
    }
}
