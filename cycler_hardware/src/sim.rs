//! Simulated supply: answers the instrument vocabulary against a quasi-static
//! cell model (fixed series resistance, EMF that drifts with delivered
//! charge). Good enough to exercise the whole control stack without a rig.

use std::collections::HashMap;
use std::time::Duration;

use cycler_traits::Instrument;

/// Cell model parameters.
#[derive(Debug, Clone, Copy)]
pub struct SimCell {
    /// Open-circuit EMF, volts.
    pub emf: f32,
    /// Internal series resistance, ohms.
    pub isr_ohms: f32,
    /// EMF drift per ampere per current readback, volts. One readback per
    /// control tick makes this an effective V per A·s.
    pub drift_v_per_amp_read: f32,
}

impl Default for SimCell {
    fn default() -> Self {
        Self {
            emf: 1.25,
            isr_ohms: 0.05,
            drift_v_per_amp_read: 0.0,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct ChannelSetting {
    volts: f32,
    amps: f32,
}

pub struct SimulatedSupply {
    cell: SimCell,
    present: bool,
    channels: HashMap<String, ChannelSetting>,
    charge_ch: String,
    sink_ch: String,
    sense_ch: String,
    output_on: bool,
    display: Option<String>,
}

impl SimulatedSupply {
    pub fn new(cell: SimCell) -> Self {
        Self {
            cell,
            present: true,
            channels: HashMap::new(),
            charge_ch: "P25V".to_string(),
            sink_ch: "N25V".to_string(),
            sense_ch: "P6V".to_string(),
            output_on: false,
            display: None,
        }
    }

    pub fn remove_cell(&mut self) {
        self.present = false;
    }

    pub fn insert_cell(&mut self, emf: f32) {
        self.present = true;
        self.cell.emf = emf;
    }

    /// Last `DISP:TEXT` payload, or None after `DISP Off`.
    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }

    fn setting(&self, name: &str) -> ChannelSetting {
        self.channels.get(name).copied().unwrap_or_default()
    }

    /// Signed cell current under the present channel programming. The sink
    /// channel wins when programmed; the translator never drives both.
    fn cell_current(&self) -> f32 {
        if !self.present || !self.output_on {
            return 0.0;
        }
        let sink = self.setting(&self.sink_ch);
        if sink.amps > 0.0 {
            return -sink.amps;
        }
        let charge = self.setting(&self.charge_ch);
        if charge.amps > 0.0 {
            // Constant current until the programmed ceiling, then the supply
            // folds back to constant voltage.
            let cc_terminal = self.cell.emf + self.cell.isr_ohms * charge.amps;
            if cc_terminal <= charge.volts || self.cell.isr_ohms == 0.0 {
                return charge.amps;
            }
            return ((charge.volts - self.cell.emf) / self.cell.isr_ohms).max(0.0);
        }
        0.0
    }

    fn terminal_volts(&self) -> f32 {
        if !self.present {
            // An empty fixture floats at the sense supply programming.
            return self.setting(&self.sense_ch).volts;
        }
        self.cell.emf + self.cell.isr_ohms * self.cell_current()
    }

    fn execute(&mut self, piece: &str) -> Option<String> {
        let piece = piece.trim();
        if piece.is_empty() {
            return None;
        }
        if let Some(rest) = piece.strip_prefix("APPL ") {
            let mut parts = rest.split(',');
            let name = parts.next().unwrap_or("").trim().to_string();
            let volts = parts.next().and_then(|v| v.trim().parse().ok()).unwrap_or(0.0);
            let amps = parts.next().and_then(|v| v.trim().parse().ok()).unwrap_or(0.0);
            self.channels.insert(name, ChannelSetting { volts, amps });
            return None;
        }
        if let Some(rest) = piece.strip_prefix("MEAS:VOLT?") {
            let name = rest.trim();
            let v = if name == self.sense_ch {
                self.terminal_volts()
            } else {
                self.setting(name).volts
            };
            return Some(format!("{v:.4}"));
        }
        if let Some(rest) = piece.strip_prefix("MEAS:CURR?") {
            let name = rest.trim();
            let i = self.cell_current();
            // EMF drifts with delivered charge; one readback per tick.
            self.cell.emf += i * self.cell.drift_v_per_amp_read;
            let magnitude = if name == self.charge_ch {
                i.max(0.0)
            } else if name == self.sink_ch {
                (-i).max(0.0)
            } else {
                0.0
            };
            return Some(format!("{magnitude:.4}"));
        }
        if piece == "*IDN?" {
            return Some("SIMULATED,E3631A,0,1.0".to_string());
        }
        if piece == "*RST" {
            self.channels.clear();
            self.output_on = false;
            self.display = None;
            return None;
        }
        if piece.starts_with("OUTP") {
            self.output_on = rest_is_on(piece);
            return None;
        }
        if let Some(rest) = piece.strip_prefix("DISP:TEXT ") {
            self.display = Some(rest.trim().trim_matches('"').to_string());
            return None;
        }
        if piece.starts_with("DISP") {
            self.display = None;
            return None;
        }
        if piece.starts_with("SYST:REM") {
            return None;
        }
        // Unknown command: swallow it, like a confused instrument would.
        None
    }

    fn run(&mut self, command: &str) -> String {
        let mut response = String::new();
        for piece in command.split(';') {
            if let Some(r) = self.execute(piece) {
                response = r;
            }
        }
        response
    }
}

fn rest_is_on(piece: &str) -> bool {
    piece
        .split_whitespace()
        .nth(1)
        .is_some_and(|w| w.eq_ignore_ascii_case("on"))
}

impl Instrument for SimulatedSupply {
    fn send(&mut self, command: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let _ = self.run(command);
        Ok(())
    }

    fn query(
        &mut self,
        command: &str,
        _timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.run(command))
    }
}
