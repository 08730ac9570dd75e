//! RS-232 link to the supply.
//!
//! One process-wide handle, opened once at startup and held for the process
//! lifetime. The instrument cannot interleave requests, so every query blocks
//! until the response newline or the round-trip deadline.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use crate::error::HwError;
use cycler_traits::Instrument;

/// Per-read poll granularity while waiting out the round-trip deadline.
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
    read_timeout: Duration,
}

impl SerialLink {
    /// Open the port with the instrument's fixed framing (8 data bits, two
    /// stop bits, no parity, hardware handshake).
    pub fn open(path: &str, baud: u32, read_timeout: Duration) -> Result<Self, HwError> {
        let port = serialport::new(path, baud)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::Two)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::Hardware)
            .timeout(POLL_TIMEOUT)
            .open()
            .map_err(|e| HwError::Port(e.to_string()))?;
        // Drop anything the instrument sent before we were listening.
        let _ = port.clear(serialport::ClearBuffer::All);
        tracing::info!(path, baud, "serial link open");
        Ok(Self { port, read_timeout })
    }

    fn write_line(&mut self, command: &str) -> Result<(), HwError> {
        self.port.write_all(command.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()?;
        Ok(())
    }

    /// Accumulate bytes until a linefeed or the deadline. An empty return is
    /// the caller's soft-failure signal, not an error.
    fn read_line(&mut self, deadline: Instant) -> Result<String, HwError> {
        let mut buf = Vec::with_capacity(64);
        let mut byte = [0u8; 1];
        while Instant::now() < deadline {
            match self.port.read(&mut byte) {
                Ok(0) => continue,
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    buf.push(byte[0]);
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(HwError::Io(e)),
            }
        }
        let text = String::from_utf8_lossy(&buf);
        Ok(text.trim_end_matches('\r').to_string())
    }
}

impl Instrument for SerialLink {
    fn send(&mut self, command: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.write_line(command)?;
        Ok(())
    }

    fn query(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.write_line(command)?;
        let deadline = Instant::now() + timeout;
        let response = self.read_line(deadline)?;
        if response.is_empty() {
            tracing::debug!(command, "no response within timeout");
        }
        Ok(response)
    }
}
