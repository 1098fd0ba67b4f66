use std::{process, time::Duration};

use clap::Parser;
use oml4rs::{
    config::Config,
    core::settings::ENV_NAME,
    logger::LoggerManager,
    oml_values, print_error, Environment, MetadataSubject, Session, SessionArgs,
};
use tracing::{debug, error, info, warn};

/// Application name used when none is given anywhere else.
const DEFAULT_APP: &str = "oml4rsSimpleExample";

/// Streams sine and cosine samples to an OML collection endpoint.
///
/// Without `--oml-collect` (or `OML_COLLECT`) the protocol text is printed
/// to stdout instead.
#[derive(Debug, Parser)]
#[command(name = "oml4rs", version, about)]
struct Cli {
    /// Application name (falls back to the config file, then OML_NAME)
    #[arg(long = "oml-app")]
    app: Option<String>,

    /// Node identifier (falls back to OML_ID)
    #[arg(long = "oml-id")]
    id: Option<String>,

    /// Experimental domain (falls back to OML_DOMAIN)
    #[arg(long = "oml-domain")]
    domain: Option<String>,

    /// Collection URI, [tcp:]host[:port] (falls back to OML_COLLECT)
    #[arg(long = "oml-collect")]
    collect: Option<String>,

    /// Number of samples per measurement point
    #[arg(long, default_value_t = 5)]
    samples: u32,

    /// Delay between samples, in milliseconds
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,
}

impl Cli {
    fn session_args(&self) -> SessionArgs {
        SessionArgs {
            app_name: self.app.clone(),
            domain: self.domain.clone(),
            node: self.id.clone(),
            collect: self.collect.clone(),
        }
    }
}

/// Angle in degrees of sample `i`, cycling through one full turn.
fn sample_angle(i: u32) -> i32 {
    15 * (i % 24) as i32
}

async fn run_samples(session: &mut Session, samples: u32, interval: Duration) -> oml4rs::Result<()> {
    session
        .inject_metadata(
            MetadataSubject::Field {
                point: "SinMP",
                field: "angle",
            },
            "unit",
            "degrees",
        )
        .await?;

    for i in 0..samples {
        tokio::time::sleep(interval).await;
        let angle = sample_angle(i);
        let radians = f64::from(angle).to_radians();
        let label = format!("label_{}", angle);

        session
            .inject("SinMP", &oml_values![label.as_str(), angle, radians.sin()])
            .await?;
        session
            .inject("CosMP", &oml_values![label, radians.cos()])
            .await?;
        debug!("Sample {} injected", i);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let cfg = Config::new().unwrap_or_else(|e| {
        print_error!("{}", e);
        process::exit(1);
    });
    let logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to setup Log Manager: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });
    info!("Starting oml4rs version {}...", env!("CARGO_PKG_VERSION"));

    let env = Environment::capture();
    let mut args = cfg.client.apply_to(cli.session_args());
    if args.app_name.is_none() && env.get(ENV_NAME).is_none() {
        args.app_name = Some(DEFAULT_APP.to_string());
    }

    let mut session = Session::with_environment(args, &env).unwrap_or_else(|e| {
        error!("Failed to initialize session: {}", e);
        process::exit(1);
    });
    session.add_mp("SinMP", "label:string angle:int32 value:double")?;
    session.add_mp("CosMP", "label:string value:double")?;

    if let Err(e) = session.start().await {
        error!("Failed to start session: {}", e);
        process::exit(1);
    }

    let interval = Duration::from_millis(cli.interval_ms);
    let outcome = tokio::select! {
        result = run_samples(&mut session, cli.samples, interval) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Received Ctrl+C, closing session early");
            Ok(())
        }
    };

    let closed = session.close().await;
    outcome?;
    closed?;
    info!("Shutdown complete");
    Ok(())
}
