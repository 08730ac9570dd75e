#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Transport implementations for the cycling rig.
//!
//! The real RS-232 link lives behind the `hardware` feature; the simulated
//! supply answers the same SCPI vocabulary against a quasi-static cell model
//! and is always available for tests, demos, and self-checks.

pub mod error;
#[cfg(feature = "hardware")]
pub mod serial;
pub mod sim;

#[cfg(feature = "hardware")]
pub use serial::SerialLink;
pub use sim::{SimCell, SimulatedSupply};

use cycler_traits::OperatorKeys;

/// Operator keyboard on the controlling terminal.
///
/// Raw mode is enabled for the lifetime of the value so single keys arrive
/// without a newline; restored on drop.
pub struct ConsoleKeys {
    raw: bool,
}

impl ConsoleKeys {
    pub fn new() -> Self {
        use crossterm::tty::IsTty;
        let raw = if std::io::stdin().is_tty() {
            match crossterm::terminal::enable_raw_mode() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "could not enter raw mode; keys disabled");
                    false
                }
            }
        } else {
            false
        };
        Self { raw }
    }
}

impl Default for ConsoleKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorKeys for ConsoleKeys {
    fn poll_key(&mut self) -> Option<char> {
        use crossterm::event::{self, Event, KeyCode, KeyEventKind};
        if !self.raw {
            return None;
        }
        if !event::poll(std::time::Duration::ZERO).ok()? {
            return None;
        }
        match event::read().ok()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char(c) => Some(c),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Drop for ConsoleKeys {
    fn drop(&mut self) {
        if self.raw {
            let _ = crossterm::terminal::disable_raw_mode();
        }
    }
}

/// Keyboard stub for headless runs; never reports a key.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoKeys;

impl OperatorKeys for NoKeys {
    fn poll_key(&mut self) -> Option<char> {
        None
    }
}
