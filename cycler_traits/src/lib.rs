pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Text-command link to the programmable supply.
///
/// Commands are ASCII, newline-terminated by the implementation. A query is
/// any command containing `?`; `query` returns the raw response text, which
/// may be empty when the instrument did not answer within the timeout. An
/// empty response is a soft failure for the caller to absorb, not an `Err`;
/// `Err` is reserved for the link itself breaking.
pub trait Instrument {
    fn send(&mut self, command: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn query(
        &mut self,
        command: &str,
        timeout: std::time::Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// Non-blocking operator keyboard.
///
/// `poll_key` must never block: it returns the next pending key, if any, and
/// is called once per control tick.
pub trait OperatorKeys {
    fn poll_key(&mut self) -> Option<char>;
}

impl<T: Instrument + ?Sized> Instrument for Box<T> {
    fn send(&mut self, command: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).send(command)
    }

    fn query(
        &mut self,
        command: &str,
        timeout: std::time::Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        (**self).query(command, timeout)
    }
}

impl<T: OperatorKeys + ?Sized> OperatorKeys for Box<T> {
    fn poll_key(&mut self) -> Option<char> {
        (**self).poll_key()
    }
}
