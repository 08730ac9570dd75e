//! Human-readable error descriptions for operators.

/// Map an eyre::Report to a human-readable explanation with likely causes and
/// fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use cycler_core::error::{AbortReason, BuildError, CyclerError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingInstrument => {
                "What happened: No instrument link was provided to the cycling engine.\nLikely causes: The serial port failed to open or was not wired into the builder.\nHow to fix: Check [link].port in the config, or run with --simulate.".to_string()
            }
            BuildError::MissingKeys => {
                "What happened: No operator keyboard was provided to the cycling engine.\nLikely causes: Builder was not given a key source.\nHow to fix: Pass a ConsoleKeys or NoKeys value via with_keys(...).".to_string()
            }
            BuildError::MissingCell => {
                "What happened: Cell parameters not set.\nLikely causes: The config lacks a [cell] section and no --capacity-ah/--v-max overrides were given.\nHow to fix: Add [cell] capacity_ah and v_max to the config.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CyclerError>() {
        if matches!(ce, CyclerError::Timeout) {
            return "What happened: The instrument did not answer within the timeout.\nLikely causes: Wrong serial port, cable unplugged, or instrument powered off.\nHow to fix: Verify [link].port and the cable, and consider raising link.read_timeout_ms.".to_string();
        }
        if let CyclerError::Abort(reason) = ce {
            return match reason {
                AbortReason::OpenCircuit => "What happened: Measured current fell below the sense floor (open circuit).\nLikely causes: Cell removed mid-run, broken fixture contact, or blown in-line regulator.\nHow to fix: Reseat the cell and check the discharge path wiring.".to_string(),
                AbortReason::OperatorToggle => "What happened: An operator key requested a phase switch.\nLikely causes: The toggle key was pressed at the console.\nHow to fix: Nothing; this is the manual phase control working as intended.".to_string(),
                AbortReason::Shutdown => "What happened: Shutdown was requested (ctrl-c).\nLikely causes: Operator interrupt.\nHow to fix: Nothing; the supply was parked before exit.".to_string(),
            };
        }
        return format!(
            "What happened: {ce}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("serial") || lower.contains("port") {
        return "What happened: Failed to open the serial link to the instrument.\nLikely causes: Wrong device path, missing permissions, or the port is held by another process.\nHow to fix: Fix [link].port in the config and ensure the process may access the device.".to_string();
    }

    if lower.contains("toml") || lower.contains("config") {
        return "What happened: The config file could not be read or parsed.\nLikely causes: Missing file, syntax error, or values out of range.\nHow to fix: Check the --config path and compare against etc/cycler.toml.".to_string();
    }

    format!("What happened: {msg}.\nHow to fix: Re-run with --log-level=debug for more detail.")
}
