//! Test and helper mocks for cycler_core

use cycler_traits::{Instrument, OperatorKeys};

/// Keyboard that never reports a key; useful for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopKeys;

impl OperatorKeys for NoopKeys {
    fn poll_key(&mut self) -> Option<char> {
        None
    }
}

/// Link that swallows commands and answers every query with an empty string,
/// exercising the soft-failure path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLink;

impl Instrument for NoopLink {
    fn send(&mut self, _command: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }

    fn query(
        &mut self,
        _command: &str,
        _timeout: std::time::Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok(String::new())
    }
}
