#[macro_use]
extern crate tracing;

use std::path::PathBuf;

use structopt::StructOpt;
use tokio::runtime::Builder;
use tokio::signal;

use gridlight::models::ServerConfig;

#[derive(Debug, StructOpt)]
struct Opts {
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u32,
    #[structopt(short, long = "config")]
    config_path: Option<PathBuf>,
    #[structopt(long)]
    dump_config: bool,
}

async fn run(opts: Opts) -> color_eyre::eyre::Result<()> {
    // Load configuration
    let config = {
        if let Some(config_path) = opts
            .config_path
            .or_else(gridlight::models::Config::default_path)
        {
            gridlight::models::Config::load_file(&config_path).await?
        } else {
            debug!("no configuration file found, using defaults");
            gridlight::models::Config::default()
        }
    };

    // Dump configuration if this was asked
    if opts.dump_config {
        print!("{}", config.to_string()?);
        return Ok(());
    }

    // Create the LED controller
    let (instance, handle) = gridlight::instance::Instance::new(&config).await;
    let instance = tokio::spawn(instance.run());

    // Create the global state object
    let global = gridlight::global::GlobalData::new(&config, handle.clone()).wrap();

    // Start the JSON server
    let _json_server = if config.json_server.enable() {
        Some(
            gridlight::servers::bind(
                "JSON",
                config.json_server.clone(),
                global.clone(),
                gridlight::servers::json::handle_client,
            )
            .await?,
        )
    } else {
        None
    };

    // Start the HTTP server
    let _web_server = if config.web_config.enable() {
        Some(tokio::spawn(
            gridlight::web::bind(global.clone(), &config.web_config).await?,
        ))
    } else {
        None
    };

    info!(
        name = %config.general.name,
        rows = %config.grid.rows,
        columns = %config.grid.columns,
        "gridlightd started"
    );

    signal::ctrl_c().await?;
    info!("shutting down");

    // Turn off the LEDs before leaving
    if let Err(error) = handle.stop().await {
        warn!(error = %error, "controller already stopped");
    }

    instance.await?;

    Ok(())
}

fn install_tracing(opts: &Opts) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let fmt_layer = fmt::layer();

    let filter_layer = EnvFilter::try_from_env("GRIDLIGHT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(match opts.verbose {
            0 => "gridlight=warn,gridlightd=warn",
            1 => "gridlight=info,gridlightd=info",
            2 => "gridlight=debug,gridlightd=debug",
            _ => "gridlight=trace,gridlightd=trace",
        })
    });

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()
}

#[paw::main]
fn main(opts: Opts) -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    install_tracing(&opts)?;

    // Create tokio runtime
    let thd_count = match num_cpus::get() {
        1 => 2,
        other => other.min(4),
    };

    let rt = Builder::new_multi_thread()
        .worker_threads(thd_count)
        .enable_all()
        .build()?;
    rt.block_on(run(opts))
}
