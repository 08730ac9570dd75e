//! Front end for the programmable supply: actuation translation, measurement,
//! and display. The single funnel for all instrument traffic; no other
//! component holds the link.

use std::time::Duration;

use eyre::WrapErr;

use crate::config::SupplyCfg;
use crate::error::Result;
use crate::link_error::map_link_error;
use cycler_traits::Instrument;

pub struct Supply<I: Instrument> {
    link: I,
    cfg: SupplyCfg,
    /// Latched after the first unparseable reading so a flaky link warns once,
    /// not once per tick.
    soft_fail_logged: bool,
}

impl<I: Instrument> Supply<I> {
    pub fn new(link: I, cfg: SupplyCfg) -> Self {
        Self {
            link,
            cfg,
            soft_fail_logged: false,
        }
    }

    pub fn cfg(&self) -> &SupplyCfg {
        &self.cfg
    }

    /// Bring the instrument to a known state and program the 4-wire sense
    /// channel. Returns the identity string.
    pub fn initialize(&mut self) -> Result<String> {
        let idn = self.query_text("*IDN?")?;
        tracing::info!(identity = %idn, "instrument");
        self.send("*RST")?;
        self.send("SYST:REM")?;
        let sense = format!(
            "APPL {},{:.1},{:.3}",
            self.cfg.sense_channel, self.cfg.sense_volts, self.cfg.sense_amps
        );
        self.send(&sense)?;
        self.send("OUTP ON")?;
        Ok(idn)
    }

    /// Actuation translation: one channel sources, the other is disabled.
    ///
    /// The sign of `amps` alone selects the sense. Discharge programs the sink
    /// channel below ground by the regulator's forward drop so the cell sees
    /// the intended current through the in-line regulator. Exactly two set
    /// commands per call, no readback.
    pub fn apply(&mut self, comply_volts: f32, amps: f32) -> Result<()> {
        let cmd = if amps >= 0.0 {
            format!(
                "APPL {},{:.3},{:.3};APPL {},0,0",
                self.cfg.charge_channel, comply_volts, amps, self.cfg.sink_channel
            )
        } else {
            format!(
                "APPL {},{:.3},0;APPL {},-{:.1},{:.3}",
                self.cfg.charge_channel,
                comply_volts,
                self.cfg.sink_channel,
                self.cfg.regulator_drop_v,
                -amps
            )
        };
        self.send(&cmd)
    }

    /// Compliance ceiling for a commanded current: the cell-side ceiling plus
    /// the drop across leads and meter at that current.
    pub fn comply_for(&self, v_max: f32, amps: f32) -> f32 {
        v_max + amps * self.cfg.lead_resistance_ohms
    }

    /// Terminal voltage from the dedicated sense channel.
    pub fn read_voltage(&mut self) -> Result<f32> {
        let cmd = format!("MEAS:VOLT? {}", self.cfg.sense_channel);
        self.query_number(&cmd)
    }

    /// Cell current. The hint selects the channel; the sink channel reports a
    /// positive magnitude which is negated so the sign convention matches the
    /// command target (positive = charging).
    pub fn read_current(&mut self, hint_amps: f32) -> Result<f32> {
        if hint_amps >= 0.0 {
            let cmd = format!("MEAS:CURR? {}", self.cfg.charge_channel);
            self.query_number(&cmd)
        } else {
            let cmd = format!("MEAS:CURR? {}", self.cfg.sink_channel);
            Ok(-self.query_number(&cmd)?)
        }
    }

    pub fn display_text(&mut self, text: &str) -> Result<()> {
        self.send(&format!("DISP:TEXT \"{text}\""))
    }

    pub fn display_off(&mut self) -> Result<()> {
        self.send("DISP Off")
    }

    /// True once the sense reading falls below the empty-fixture float level.
    pub fn cell_present(&mut self) -> Result<bool> {
        Ok(self.read_voltage()? < self.cfg.cell_present_below_v)
    }

    /// Zero both channels (best effort safing).
    pub fn park(&mut self) -> Result<()> {
        self.apply(0.0, 0.0)
    }

    fn send(&mut self, command: &str) -> Result<()> {
        self.link
            .send(command)
            .map_err(|e| eyre::Report::new(map_link_error(&*e)))
            .wrap_err("sending command")
    }

    fn query_text(&mut self, command: &str) -> Result<String> {
        let timeout = Duration::from_millis(self.cfg.read_timeout_ms);
        self.link
            .query(command, timeout)
            .map_err(|e| eyre::Report::new(map_link_error(&*e)))
            .wrap_err("querying instrument")
    }

    /// Numeric query. An empty or unparseable response degrades to 0.0; the
    /// loop keeps running and a human notices the anomalous log line.
    fn query_number(&mut self, command: &str) -> Result<f32> {
        let text = self.query_text(command)?;
        match text.trim().parse::<f32>() {
            Ok(v) => Ok(v),
            Err(_) => {
                if !self.soft_fail_logged {
                    self.soft_fail_logged = true;
                    tracing::warn!(command, response = %text, "unparseable reading, degrading to 0");
                } else {
                    tracing::debug!(command, response = %text, "unparseable reading");
                }
                Ok(0.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Link that records every command and replays scripted query responses.
    struct ScriptLink {
        sent: Vec<String>,
        responses: Vec<String>,
    }

    impl ScriptLink {
        fn new(responses: &[&str]) -> Self {
            Self {
                sent: Vec::new(),
                responses: responses.iter().rev().map(|s| s.to_string()).collect(),
            }
        }
    }

    impl Instrument for ScriptLink {
        fn send(
            &mut self,
            command: &str,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.sent.push(command.to_string());
            Ok(())
        }

        fn query(
            &mut self,
            command: &str,
            _timeout: Duration,
        ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
            self.sent.push(command.to_string());
            Ok(self.responses.pop().unwrap_or_default())
        }
    }

    #[test]
    fn charge_target_disables_sink_channel() {
        let mut supply = Supply::new(ScriptLink::new(&[]), SupplyCfg::default());
        supply.apply(1.77, 0.35).expect("apply");
        assert_eq!(
            supply.link.sent,
            vec!["APPL P25V,1.770,0.350;APPL N25V,0,0".to_string()]
        );
    }

    #[test]
    fn discharge_target_disables_charge_current() {
        let mut supply = Supply::new(ScriptLink::new(&[]), SupplyCfg::default());
        supply.apply(1.7, -0.175).expect("apply");
        assert_eq!(
            supply.link.sent,
            vec!["APPL P25V,1.700,0;APPL N25V,-4.6,0.175".to_string()]
        );
    }

    #[test]
    fn sink_current_is_negated() {
        let mut supply = Supply::new(ScriptLink::new(&["0.1750"]), SupplyCfg::default());
        let amps = supply.read_current(-0.175).expect("read");
        assert!((amps + 0.175).abs() < 1e-6);
    }

    #[test]
    fn empty_response_degrades_to_zero() {
        let mut supply = Supply::new(ScriptLink::new(&[""]), SupplyCfg::default());
        let v = supply.read_voltage().expect("read");
        assert_eq!(v, 0.0);
        assert!(supply.soft_fail_logged);
    }

    #[test]
    fn scpi_exponent_notation_parses() {
        let mut supply = Supply::new(ScriptLink::new(&["+1.02340000E+00"]), SupplyCfg::default());
        let v = supply.read_voltage().expect("read");
        assert!((v - 1.0234).abs() < 1e-6);
    }
}
