//! BioMark firmware entry point.
//!
//! Hexagonal architecture with a single cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter     RtdbAdapter      NvsAdapter   Esp32Time   │
//! │  (Fingerprint +      (RemoteStore)    (Config)     (Clock)     │
//! │   Feedback)          WifiAdapter      LogEventSink             │
//! │                      (Connectivity)   (EventSink)              │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Dispatcher · Enroll · Delete · Attendance · Liveness  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Result;
use esp_idf_hal::delay::{Delay, FreeRtos};
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{error, info, warn};

use biomark::adapters::hardware::HardwareAdapter;
use biomark::adapters::log_sink::LogEventSink;
use biomark::adapters::nvs::NvsAdapter;
use biomark::adapters::rtdb::RtdbAdapter;
use biomark::adapters::time::Esp32TimeAdapter;
use biomark::adapters::wifi::{ConnectivityPort, WifiAdapter};
use biomark::app::ports::{ClockPort, ConfigError, ConfigPort, FeedbackPort, RemoteStorePort};
use biomark::app::service::AppService;
use biomark::config::SystemConfig;
use biomark::drivers::buzzer::Buzzer;
use biomark::drivers::display::TextPanel;
use biomark::drivers::fingerprint::FingerprintDriver;
use biomark::drivers::transport::UartTransport;
use biomark::drivers::hw_init;
use biomark::drivers::watchdog::Watchdog;
use biomark::feedback::Tone;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  BioMark v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    if let Err(e) = hw_init::init_peripherals() {
        // Without the buzzer the terminal still works; carry on silently.
        warn!("HAL init failed: {}", e);
    }

    // ── 2. Config from NVS (or defaults) ──────────────────────
    let config = match NvsAdapter::new().and_then(|nvs| nvs.load()) {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(ConfigError::NotFound) => {
            info!("No stored config, using defaults");
            SystemConfig::default()
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // UART2 on pins::FINGERPRINT_TX_GPIO / pins::FINGERPRINT_RX_GPIO.
    let uart = UartTransport::new(
        peripherals.uart2,
        AnyIOPin::from(peripherals.pins.gpio17),
        AnyIOPin::from(peripherals.pins.gpio16),
    )?;
    let sensor = FingerprintDriver::new(uart, Delay::new_default(), config.slot_capacity);
    let mut hw = HardwareAdapter::new(sensor, Buzzer::new(), TextPanel::new());
    let mut sink = LogEventSink::new();

    // ── 4. Network + time ─────────────────────────────────────
    hw.notify(&["Connecting", "WiFi..."], Some(Tone::Waiting));
    let driver = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs_partition))?,
        sysloop,
    )?;
    let mut wifi = WifiAdapter::new().with_driver(driver);
    match wifi.set_credentials(&config.wifi_ssid, &config.wifi_password) {
        Ok(()) => match wifi.connect() {
            Ok(()) => hw.notify(&["WiFi", "Connected"], Some(Tone::Success)),
            Err(e) => {
                warn!("WiFi: {} (will keep retrying)", e);
                hw.notify(&["WiFi", "Failed"], Some(Tone::Failure));
            }
        },
        Err(e) => error!("WiFi credentials rejected: {}", e),
    }

    let mut clock = Esp32TimeAdapter::new();
    if let Err(e) = clock.start_sync() {
        warn!("SNTP start failed: {}", e);
    }

    let mut store = RtdbAdapter::new(&config.database_url, &config.auth_token);
    store.set_online(wifi.is_connected());

    // ── 5. Sensor handshake ───────────────────────────────────
    hw.notify(&["Initializing", "Fingerprint..."], None);
    FreeRtos::delay_ms(1_000);
    if let Err(e) = hw.sensor_mut().verify_password() {
        error!("Fingerprint sensor not found: {}", e);
        hw.notify(&["Fingerprint", "Not Found"], Some(Tone::Failure));
        // The watchdog is not yet armed, so park here instead of rebooting
        // into the same failure.
        loop {
            FreeRtos::delay_ms(1_000);
        }
    }
    hw.notify(&["Fingerprint", "Sensor Ready"], Some(Tone::Success));

    // ── 6. Application core ───────────────────────────────────
    let loop_ms = config.loop_interval_ms;
    let mut app = AppService::new(config);
    app.start(&mut hw, &mut sink);

    let mut delay = Delay::new_default();
    if store.is_ready() {
        if let Err(e) = app.provision(&mut store, &mut delay) {
            warn!("Device node not provisioned: {}", e);
        }
    }

    let mut watchdog = Watchdog::default();
    info!("Entering control loop ({} ms)", loop_ms);

    // ── 7. Control loop ───────────────────────────────────────
    loop {
        wifi.poll(clock.uptime_ms());
        store.set_online(wifi.is_connected());

        hw.tick(loop_ms);
        app.tick(&mut hw, &mut store, &clock, &mut delay, &mut sink);

        watchdog.feed();
        FreeRtos::delay_ms(loop_ms);
    }
}
