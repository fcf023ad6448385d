//! thermoloop-hw-interface
//!
//! Temperature controller firmware for the Raspberry Pi Pico 2. Wires the
//! library crates to the board:
//!
//! 1. A DS18B20 on a PIO one-wire bus supplies the measurement.
//! 2. The rotary encoder and its push button are sampled on GPIO each tick;
//!    a press toggles setpoint adjustment, turning edits the setpoint.
//! 3. The PID output drives the heater through a PWM channel.
//! 4. The SSD1306 OLED on I2C0 shows mode, temperature, setpoint and output.
//!
//! Everything runs in one Embassy task; see `ControlLoop::run`.

#![no_std]
#![no_main]

mod board;
mod sensor;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::block::ImageDef;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::{I2C0, PIO0};
use embassy_rp::pio::{self, Pio};
use embassy_rp::pio_programs::onewire::{PioOneWire, PioOneWireProgram};
use embassy_rp::pwm::{self, Pwm, PwmOutput};
use {defmt_rtt as _, panic_probe as _};

use board::{PanelInputs, PwmHeater};
use sensor::Ds18b20;
use thermoloop::controller::{Board, ControlLoop, ControllerConfig};
use thermoloop_oled_display_rs::{DisplayConfig, OledDriver};

// ---------------------------------------------------------------------------
// Boot block and interrupt binding
// ---------------------------------------------------------------------------

/// Tell the RP2350 Boot ROM about our application.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = embassy_rp::block::ImageDef::secure_exe();

bind_interrupts!(struct Irqs {
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
    PIO0_IRQ_0 => pio::InterruptHandler<PIO0>;
});

/// SSD1306 I2C address.
const OLED_ADDRESS: u8 = 0x3C;

/// PWM counter wrap. At the default divider this gives a ~2.3 kHz carrier.
const PWM_TOP: u16 = u16::MAX;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

type Controller = ControlLoop<
    Ds18b20<'static, PIO0, 0>,
    PwmHeater<PwmOutput<'static>>,
    OledDriver<I2c<'static, I2C0, i2c::Async>>,
    PanelInputs<'static>,
>;

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[embassy_executor::task]
async fn control_task(controller: Controller) {
    controller.run().await
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("thermoloop-hw-interface starting");

    // —— Pin assignments ————————————————————————————————————————————————————
    // I2C_SDA → GP20  (p.PIN_20)
    // I2C_SCL → GP21  (p.PIN_21)
    // ENC_A   → GP10  (p.PIN_10)  pull-up
    // ENC_B   → GP11  (p.PIN_11)  pull-up
    // ENC_SW  → GP12  (p.PIN_12)  active-low, pull-up
    // HEATER  → GP14  (p.PIN_14)  PWM7 A
    // DS18B20 → GP16  (p.PIN_16)  one-wire, external 4.7k pull-up
    // ———————————————————————————————————————————————————————————————————————

    let config = ControllerConfig::default();

    // Temperature sensor.
    let Pio {
        mut common, sm0, ..
    } = Pio::new(p.PIO0, Irqs);
    let program = PioOneWireProgram::new(&mut common);
    let wire = PioOneWire::new(&mut common, sm0, p.PIN_16, &program);
    let mut sensor = Ds18b20::new(wire);
    match sensor.init().await {
        Ok(t) => info!("DS18B20 ready: {} C", t),
        // The loop keeps the heater off until the sensor answers.
        Err(fault) => warn!("DS18B20 not ready: {}", fault),
    }

    // Heater.
    let mut pwm_config = pwm::Config::default();
    pwm_config.top = PWM_TOP;
    let (heater, _) = Pwm::new_output_a(p.PWM_SLICE7, p.PIN_14, pwm_config).split();
    let heater = PwmHeater::new(unwrap!(heater), config.output_max);

    // OLED display, sole device on I2C0.
    let i2c = I2c::new_async(
        p.I2C0,
        p.PIN_21, // SCL
        p.PIN_20, // SDA
        Irqs,
        i2c::Config::default(),
    );
    let mut oled = OledDriver::new(i2c, OLED_ADDRESS, DisplayConfig::default());
    if let Err(e) = oled.init().await {
        // Renders report NotInitialized; control carries on without a display.
        error!("OLED init failed: {}", e);
    }

    // Encoder and button.
    let inputs = PanelInputs::new(
        Input::new(p.PIN_10, Pull::Up),
        Input::new(p.PIN_11, Pull::Up),
        Input::new(p.PIN_12, Pull::Up),
    );

    let board = Board {
        sensor,
        power: heater,
        display: oled,
        inputs,
    };
    let controller = unwrap!(ControlLoop::new(config, board));

    spawner.spawn(unwrap!(control_task(controller)));
    info!("Control task spawned");
}
