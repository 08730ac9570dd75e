//! Process entry: config loading, logging setup, hardware assembly, and
//! subcommand dispatch.

mod cli;
mod error_fmt;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;

use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use cycler_config::Config;
use cycler_hardware::{ConsoleKeys, SimCell, SimulatedSupply};
use cycler_traits::{Instrument, OperatorKeys};

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    let result = run(&args);
    if let Err(err) = result {
        eprintln!("{}", error_fmt::humanize(&err));
        return Err(err);
    }
    Ok(())
}

fn run(args: &Cli) -> eyre::Result<()> {
    let cfg = load_config(args)?;
    init_logging(args, &cfg.logging)?;
    let _ = JSON_MODE.set(args.json);

    match &args.cmd {
        Commands::Cycle {
            capacity_ah,
            v_max,
            port,
            simulate,
        } => run_cycle(&cfg, *capacity_ah, *v_max, port.clone(), *simulate),
        Commands::SelfCheck { simulate } => self_check(&cfg, *simulate, args.json),
    }
}

fn load_config(args: &Cli) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(&args.config)
        .wrap_err_with(|| format!("reading config {}", args.config.display()))?;
    let cfg = cycler_config::load_toml(&text).wrap_err("parsing config TOML")?;
    cfg.validate()?;
    Ok(cfg)
}

fn init_logging(args: &Cli, logging: &cycler_config::Logging) -> eyre::Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let level = logging
        .level
        .clone()
        .unwrap_or_else(|| args.log_level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // File sink is always JSON lines; the console follows --json.
    let file_layer = match &logging.file {
        Some(path) => {
            let path = std::path::Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .map(std::ffi::OsStr::to_os_string)
                .unwrap_or_else(|| "cycler.log".into());
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_writer(writer))
        }
        None => None,
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if args.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
    Ok(())
}

fn open_link(
    cfg: &Config,
    port: Option<String>,
    simulate: bool,
) -> eyre::Result<Box<dyn Instrument>> {
    if simulate {
        tracing::info!("using simulated supply");
        let cell = SimCell {
            drift_v_per_amp_read: 5e-5,
            ..SimCell::default()
        };
        return Ok(Box::new(SimulatedSupply::new(cell)));
    }
    #[cfg(feature = "hardware")]
    {
        let path = port.unwrap_or_else(|| cfg.link.port.clone());
        let link = cycler_hardware::SerialLink::open(
            &path,
            cfg.link.baud,
            std::time::Duration::from_millis(cfg.link.read_timeout_ms),
        )
        .map_err(|e| eyre::eyre!("open serial port {path}: {e}"))?;
        Ok(Box::new(link))
    }
    #[cfg(not(feature = "hardware"))]
    {
        let _ = (cfg, port);
        eyre::bail!("built without the `hardware` feature; use --simulate")
    }
}

fn run_cycle(
    cfg: &Config,
    capacity_ah: Option<f32>,
    v_max: Option<f32>,
    port: Option<String>,
    simulate: bool,
) -> eyre::Result<()> {
    let mut cell: cycler_core::CellCfg = (&cfg.cell).into();
    if let Some(c) = capacity_ah {
        cell.capacity_ah = c;
    }
    if let Some(v) = v_max {
        cell.v_max = v;
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .wrap_err("installing ctrl-c handler")?;

    let link = open_link(cfg, port, simulate)?;
    let keys: Box<dyn OperatorKeys> = Box::new(ConsoleKeys::new());

    let mut cycler = cycler_core::Cycler::builder()
        .with_link(link)
        .with_keys(keys)
        .with_cell(cell)
        .with_supply((&cfg.link).into())
        .with_estimator((&cfg.estimator).into())
        .with_discharge((&cfg.discharge).into())
        .with_charge((&cfg.charge).into())
        .with_report((&cfg.report).into())
        .with_shutdown_flag(shutdown)
        .build()?;

    let identity = cycler.initialize()?;
    tracing::info!(identity = %identity, capacity_ah = cell.capacity_ah, v_max = cell.v_max, "cycling rig ready");
    cycler.run()
}

fn self_check(cfg: &Config, simulate: bool, json: bool) -> eyre::Result<()> {
    let link = open_link(cfg, None, simulate)?;
    let mut supply = cycler_core::Supply::new(link, (&cfg.link).into());
    let identity = supply.initialize()?;
    supply.park()?;
    if json {
        println!("{}", serde_json::json!({ "ok": true, "identity": identity }));
    } else {
        println!("instrument: {identity}");
    }
    Ok(())
}
