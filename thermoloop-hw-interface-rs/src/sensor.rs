//! DS18B20 temperature sensor on a PIO one-wire bus.
//!
//! Conversions run in the background. Each read returns the most recent
//! completed conversion; once a conversion has had time to finish, the
//! scratchpad is read and the next conversion is started in the same call.

use defmt::*;
use embassy_rp::pio;
use embassy_rp::pio_programs::onewire::PioOneWire;
use embassy_time::{Duration, Instant, Timer};
use thermoloop::controller::{SensorFault, TemperatureSensor};

const SKIP_ROM: u8 = 0xCC;
const CONVERT_T: u8 = 0x44;
const READ_SCRATCHPAD: u8 = 0xBE;
const WRITE_SCRATCHPAD: u8 = 0x4E;

/// Configuration register value for 9-bit (0.5 °C) resolution.
const RESOLUTION_9_BIT: u8 = 0x1F;

/// Bits of the configuration register that do not depend on resolution,
/// and the value they always read back as.
const CONFIG_FIXED_MASK: u8 = 0x9F;
const CONFIG_FIXED_BITS: u8 = 0x1F;

/// Worst-case 9-bit conversion time is 93.75 ms.
const CONVERSION_TIME: Duration = Duration::from_millis(100);

/// Operating range from the datasheet, in °C.
const MIN_CELSIUS: f32 = -55.0;
const MAX_CELSIUS: f32 = 125.0;

/// Single DS18B20 on its own one-wire bus.
pub struct Ds18b20<'d, PIO: pio::Instance, const SM: usize> {
    wire: PioOneWire<'d, PIO, SM>,
    converting_since: Option<Instant>,
    last: Result<f32, SensorFault>,
}

impl<'d, PIO: pio::Instance, const SM: usize> Ds18b20<'d, PIO, SM> {
    pub fn new(wire: PioOneWire<'d, PIO, SM>) -> Self {
        Self {
            wire,
            converting_since: None,
            last: Err(SensorFault::Disconnected),
        }
    }

    /// Select 9-bit resolution and wait for a first conversion, so the
    /// control loop starts with a real reading.
    pub async fn init(&mut self) -> Result<f32, SensorFault> {
        self.select().await?;
        self.wire.write_bytes(&[SKIP_ROM, WRITE_SCRATCHPAD, 0x00, 0x00, RESOLUTION_9_BIT]).await;

        self.start_conversion().await?;
        Timer::after(CONVERSION_TIME).await;
        self.read_and_restart().await
    }

    async fn select(&mut self) -> Result<(), SensorFault> {
        if self.wire.reset().await {
            Ok(())
        } else {
            Err(SensorFault::Disconnected)
        }
    }

    async fn start_conversion(&mut self) -> Result<(), SensorFault> {
        self.select().await?;
        self.wire.write_bytes(&[SKIP_ROM, CONVERT_T]).await;
        self.converting_since = Some(Instant::now());
        Ok(())
    }

    async fn read_scratchpad(&mut self) -> Result<f32, SensorFault> {
        self.select().await?;
        self.wire.write_bytes(&[SKIP_ROM, READ_SCRATCHPAD]).await;
        let mut data = [0u8; 9];
        self.wire.read_bytes(&mut data).await;
        decode_scratchpad(&data)
    }

    /// Read the finished conversion, then kick off the next one.
    async fn read_and_restart(&mut self) -> Result<f32, SensorFault> {
        self.last = self.read_scratchpad().await;
        if let Err(fault) = self.start_conversion().await {
            self.converting_since = None;
            self.last = Err(fault);
        }
        self.last
    }
}

impl<PIO: pio::Instance, const SM: usize> TemperatureSensor for Ds18b20<'_, PIO, SM> {
    async fn read_temperature(&mut self) -> Result<f32, SensorFault> {
        match self.converting_since {
            Some(started) if started.elapsed() < CONVERSION_TIME => self.last,
            Some(_) => self.read_and_restart().await,
            None => {
                // Lost the bus earlier; try to get a conversion going again.
                if let Err(fault) = self.start_conversion().await {
                    debug!("DS18B20 still absent: {}", fault);
                    self.last = Err(fault);
                }
                self.last
            }
        }
    }
}

/// Validate a 9-byte scratchpad and convert it to °C.
fn decode_scratchpad(data: &[u8; 9]) -> Result<f32, SensorFault> {
    // A floating bus reads as all ones, which also fails the CRC.
    if data.iter().all(|&b| b == 0xFF) {
        return Err(SensorFault::Disconnected);
    }
    // A line held low answers the reset and reads as all zeros, whose CRC is 0.
    if data.iter().all(|&b| b == 0x00) {
        return Err(SensorFault::Corrupt);
    }
    if crc8(data) != 0 {
        return Err(SensorFault::Corrupt);
    }
    // Configuration register: bits 0-4 read 1, bit 7 reads 0.
    if data[4] & CONFIG_FIXED_MASK != CONFIG_FIXED_BITS {
        return Err(SensorFault::Corrupt);
    }

    let celsius = i16::from_le_bytes([data[0], data[1]]) as f32 / 16.0;
    if (MIN_CELSIUS..=MAX_CELSIUS).contains(&celsius) {
        Ok(celsius)
    } else {
        Err(SensorFault::OutOfRange)
    }
}

/// Dallas/Maxim CRC-8 (polynomial 0x31, reflected). Zero over a full
/// scratchpad including its CRC byte.
fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}
