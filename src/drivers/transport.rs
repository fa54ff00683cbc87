//! Byte transport to the fingerprint module.
//!
//! The sensor driver is generic over [`Transport`], so the same packet
//! logic runs against the ESP32 UART on the device and a scripted byte
//! queue in tests.

/// Byte-oriented, non-blocking transport channel.
pub trait Transport {
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns 0 if no data is available.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Drop anything still waiting in the receive buffer.
    fn discard_input(&mut self) -> Result<(), Self::Error>;
}

// ───────────────────────────────────────────────────────────────
// UART (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use uart::UartTransport;

#[cfg(target_os = "espidf")]
mod uart {
    use esp_idf_hal::delay::NON_BLOCK;
    use esp_idf_hal::gpio::AnyIOPin;
    use esp_idf_hal::peripheral::Peripheral;
    use esp_idf_hal::uart::{self, UartDriver};
    use esp_idf_hal::units::Hertz;
    use esp_idf_sys::EspError;
    use log::info;

    use super::Transport;
    use crate::pins;

    /// AS608 link on UART2 (8N1).
    pub struct UartTransport {
        driver: UartDriver<'static>,
    }

    impl UartTransport {
        pub fn new<U: uart::Uart>(
            uart: impl Peripheral<P = U> + 'static,
            tx: AnyIOPin,
            rx: AnyIOPin,
        ) -> Result<Self, EspError> {
            let config = uart::config::Config::new().baudrate(Hertz(pins::FINGERPRINT_BAUD));
            let driver = UartDriver::new(
                uart,
                tx,
                rx,
                Option::<AnyIOPin>::None,
                Option::<AnyIOPin>::None,
                &config,
            )?;
            info!(
                "UART{}: fingerprint link at {} baud (tx={}, rx={})",
                pins::FINGERPRINT_UART,
                pins::FINGERPRINT_BAUD,
                pins::FINGERPRINT_TX_GPIO,
                pins::FINGERPRINT_RX_GPIO
            );
            Ok(Self { driver })
        }
    }

    impl Transport for UartTransport {
        type Error = EspError;

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, EspError> {
            self.driver.read(buf, NON_BLOCK)
        }

        fn write(&mut self, data: &[u8]) -> Result<usize, EspError> {
            self.driver.write(data)
        }

        fn discard_input(&mut self) -> Result<(), EspError> {
            self.driver.clear_rx()
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Null transport
// ───────────────────────────────────────────────────────────────

/// Discards writes and never answers.  Every sensor call over it times out.
pub struct NullTransport;

impl Transport for NullTransport {
    type Error = ();

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
        Ok(0)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        Ok(data.len())
    }

    fn discard_input(&mut self) -> Result<(), ()> {
        Ok(())
    }
}
