//! One-shot hardware peripheral initialization.
//!
//! Configures the LEDC timer and channel that drive the buzzer using raw
//! ESP-IDF sys calls.  Called once from `main()` before the control loop
//! starts.  The UART link to the sensor is owned by
//! [`UartTransport`](super::transport) and set up there.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    LedcTimerFailed(i32),
    LedcChannelFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::LedcTimerFailed(rc) => write!(f, "LEDC timer config failed (rc={})", rc),
            Self::LedcChannelFailed(rc) => write!(f, "LEDC channel config failed (rc={})", rc),
        }
    }
}

/// LEDC channel carrying the buzzer square wave.
pub const LEDC_CH_BUZZER: u32 = 0;
/// Resting frequency of the buzzer timer; duty is zero while silent.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const BUZZER_IDLE_FREQ_HZ: u32 = 1_000;
/// 50 % duty at 8-bit resolution.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const BUZZER_DUTY_ON: u32 = 128;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the control loop; single-threaded.
    unsafe { init_ledc()? };
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── LEDC PWM ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: BUZZER_IDLE_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK {
        return Err(HwInitError::LedcTimerFailed(ret));
    }

    let ret = unsafe {
        ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: LEDC_CH_BUZZER,
            timer_sel: ledc_timer_t_LEDC_TIMER_0,
            gpio_num: pins::BUZZER_GPIO,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        })
    };
    if ret != ESP_OK {
        return Err(HwInitError::LedcChannelFailed(ret));
    }

    info!("hw_init: LEDC configured (buzzer=CH0 on GPIO{})", pins::BUZZER_GPIO);
    Ok(())
}

/// Drive the buzzer at `freq_hz`, or silence it with `None`.
#[cfg(target_os = "espidf")]
pub fn buzzer_set(freq_hz: Option<u32>) {
    // SAFETY: the LEDC channel was configured in init_ledc(); only the
    // main loop calls this function.
    unsafe {
        match freq_hz {
            Some(hz) => {
                ledc_set_freq(ledc_mode_t_LEDC_LOW_SPEED_MODE, ledc_timer_t_LEDC_TIMER_0, hz);
                ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, LEDC_CH_BUZZER, BUZZER_DUTY_ON);
            }
            None => {
                ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, LEDC_CH_BUZZER, 0);
            }
        }
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, LEDC_CH_BUZZER);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn buzzer_set(_freq_hz: Option<u32>) {}
