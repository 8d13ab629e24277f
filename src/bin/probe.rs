//! ocshim probe
//!
//! Drives the bridge the way OpenConnect would, without linking it: installs
//! a configuration, fires a few progress messages through the variadic entry
//! point, exercises the certificate callback, and prints the counters.

use ocshim::{
    auth::ocshim_get_cert_validation_callback,
    config::BridgeConfig,
    error::{IntoShimError, Result},
    Bridge, CertVerdict, Context, Level, ProgressMode,
};
use log::{error, info};
use std::env;
use std::os::raw::{c_int, c_void};
use std::process;

struct Args {
    config_path: Option<String>,
    repeat: u32,
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        config_path: None,
        repeat: 1,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                parsed.config_path = Some(args[i + 1].clone());
                i += 1;
            }
            "--repeat" if i + 1 < args.len() => {
                parsed.repeat = args[i + 1].parse::<u32>().into_shim_error("invalid --repeat")?;
                i += 1;
            }
            "--help" | "-h" => {
                println!("usage: ocshim-probe [--config <path>] [--repeat <n>]");
                process::exit(0);
            }
            other => {
                error!("Unknown argument: {}", other);
                process::exit(2);
            }
        }
        i += 1;
    }

    Ok(parsed)
}

fn load_config(path: Option<&str>) -> Result<BridgeConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            BridgeConfig::from_file(path)
        }
        None => {
            let mut config = BridgeConfig::default();
            config.logging.forward_to_log = true;
            Ok(config)
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting {} probe v{}", ocshim::NAME, ocshim::VERSION);

    let args = parse_args()?;
    let config = load_config(args.config_path.as_deref())?;
    Bridge::install(&config)?;

    if !config.logging.forward_to_log {
        Bridge::registry().register_progress(|ctx, level, text| {
            println!("[{ctx} {level}] {}", text.to_string_lossy().trim_end());
        });
        Bridge::registry().register_progress_cursor(|ctx, level, cursor| {
            if let Some(text) = cursor.format() {
                println!("[{ctx} {level}] {}", text.to_string_lossy().trim_end());
            }
        });
    }

    info!("Progress mode: {:?}", Bridge::settings().mode);
    let progress = Bridge::progress_callback();
    let session = Context::from_raw(0x1);

    for round in 0..args.repeat {
        unsafe {
            progress(
                session.as_ptr(),
                Level::INFO.as_raw(),
                c"Connected to %s:%d (round %u)\n".as_ptr(),
                c"vpn.example.com".as_ptr(),
                443 as c_int,
                round,
            );
            progress(
                session.as_ptr(),
                Level::DEBUG.as_raw(),
                c"%s has %d items\n".as_ptr(),
                c"cart".as_ptr(),
                3 as c_int,
            );
            progress(session.as_ptr(), Level::ERR.as_raw(), std::ptr::null());
        }
    }

    let validate = ocshim_get_cert_validation_callback();
    let verdict = unsafe { validate(std::ptr::null_mut::<c_void>(), c"certificate has expired".as_ptr()) };
    info!(
        "Unhandled certificate check returned {:?}",
        CertVerdict::from_raw(verdict)
    );

    let snap = Bridge::diagnostics();
    info!(
        "delivered={} null_format={} unhandled={} panicked={} ({} mode)",
        snap.delivered,
        snap.null_format,
        snap.unhandled,
        snap.handler_panicked,
        match Bridge::settings().mode {
            ProgressMode::Formatted => "formatted",
            ProgressMode::Forward => "forward",
        }
    );

    Ok(())
}
