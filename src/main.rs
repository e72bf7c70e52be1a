use anyhow::Context;
use clap::Parser;
use printcal::console::{Console, ConsoleCommand, HELP};
use printcal::{
    client_config, init_logging, list_ports, BedLevelEvent, Config, PrinterClient,
    TelemetrySample, BUILD_DATE, VERSION,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Headless serial console for Marlin printer calibration
#[derive(Parser, Debug)]
#[command(name = "printcal", version, long_about = None)]
struct Args {
    /// List detected printer ports and exit
    #[arg(short, long)]
    list: bool,

    /// Serial port; defaults to the configured port
    port: Option<String>,

    /// Baud rate; defaults to the configured rate
    baud: Option<u32>,

    /// Configuration file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn print_ports() -> anyhow::Result<()> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No printer ports detected");
    }
    for port in ports {
        println!("{}\t{}", port.port_name, port.description);
    }
    Ok(())
}

fn attach_output(client: &PrinterClient) {
    client.add_log_listener(|text: &String| {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    });
    client.add_telemetry_listener(|sample: &TelemetrySample| {
        let hotend = sample.hotend.as_ref().map(ToString::to_string);
        let bed = sample.bed.as_ref().map(ToString::to_string);
        println!(
            "[temp] hotend {} | bed {}",
            hotend.as_deref().unwrap_or("-"),
            bed.as_deref().unwrap_or("-")
        );
    });
    client.add_bed_level_listener(|event: &BedLevelEvent| {
        println!("[level] {}", event.description());
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging()?;

    if args.list {
        return print_ports();
    }

    let config_path = match args.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let port = args
        .port
        .or_else(|| Some(config.connection.port.clone()).filter(|p| !p.is_empty()))
        .context("no port given and none configured; try --list")?;
    let baud = args.baud.unwrap_or(config.connection.baud_rate);

    tracing::info!("printcal {} (built {})", VERSION, BUILD_DATE);

    let client = Arc::new(PrinterClient::with_config(client_config(&config)));
    attach_output(&client);
    client
        .connect(&port, baud)
        .with_context(|| format!("connecting to {}", port))?;
    println!("Connected to {} @ {} baud. Type :help for commands.", port, baud);

    let mut console = Console::new(&client, config.temperature.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        let command = match ConsoleCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}\n{}", e, HELP);
                continue;
            }
        };
        if command == ConsoleCommand::Quit {
            break;
        }

        match console.execute(command) {
            Ok(Some(feedback)) => println!("{}", feedback),
            Ok(None) => {}
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    client.disconnect()?;
    Ok(())
}
