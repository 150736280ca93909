//! Side effects produced while an alarm rings.
//!
//! The core only tells the collaborator what to do; sound, speech and
//! message display belong to the host.

use crate::error::{AppError, AppResult};
use log::{info, warn};
use std::io::Write;

pub trait AlarmSignal: Send {
    /// Start the looping alarm sound. A failure is reported, not fatal.
    fn start_alarm_signal(&mut self) -> AppResult<()>;

    fn stop_alarm_signal(&mut self);

    /// Whether `announce` can actually speak on this host.
    fn supports_speech(&self) -> bool {
        false
    }

    fn announce(&mut self, _text: &str) {}

    fn show_alarm_message(&mut self, text: &str);
}

/// Does nothing. Useful for hosts that only poll the alarm state.
#[derive(Debug, Default)]
pub struct SilentSignal;

impl AlarmSignal for SilentSignal {
    fn start_alarm_signal(&mut self) -> AppResult<()> {
        Ok(())
    }

    fn stop_alarm_signal(&mut self) {}

    fn show_alarm_message(&mut self, _text: &str) {}
}

/// Rings the terminal bell and prints alarm messages to stdout.
#[derive(Debug, Default)]
pub struct TerminalSignal {
    ringing: bool,
}

impl AlarmSignal for TerminalSignal {
    fn start_alarm_signal(&mut self) -> AppResult<()> {
        let mut out = std::io::stdout();
        out.write_all(b"\x07")
            .and_then(|_| out.flush())
            .map_err(|e| AppError::signal(format!("terminal bell failed: {}", e)))?;
        self.ringing = true;
        info!("Alarm signal started");
        Ok(())
    }

    fn stop_alarm_signal(&mut self) {
        if self.ringing {
            self.ringing = false;
            info!("Alarm signal stopped");
        }
    }

    fn show_alarm_message(&mut self, text: &str) {
        println!(">>> {}  (type 'dismiss' or 'snooze')", text);
    }
}

/// Starts the alarm, falling back to a visible message when the sound fails.
pub(crate) fn start_or_fall_back(signal: &mut dyn AlarmSignal, name: &str) {
    if let Err(e) = signal.start_alarm_signal() {
        warn!("Alarm sound failed for '{}': {}", name, e);
        signal.show_alarm_message(&format!("Time for your medicine: {}!", name));
    }
}
