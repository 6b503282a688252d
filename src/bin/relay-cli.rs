use clap::{Parser, Subcommand};

use relay_sync::config::schema::TimeoutConfig;
use relay_sync::gost::{GostApi, ProxyControl};
use relay_sync::lifecycle::startup::{http_client, parse_endpoint};
use relay_sync::sync::{parse_limits, parse_rule_info};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Inspect GOST state and relay rule naming", long_about = None)]
struct Cli {
    /// GOST web API endpoint.
    #[arg(short, long, default_value = "http://127.0.0.1:18080")]
    gost: String,

    /// Request timeout in seconds.
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full GOST config snapshot
    Snapshot,
    /// List services with the rule they belong to
    Services,
    /// Decode a service name into rule id, type and node
    ParseName { service: String },
    /// Show the limiter directives derived from a rule limit
    ParseLimit { limit: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::ParseName { service } => {
            let info = parse_rule_info(&service)?;
            println!("rule_id:   {}", info.rule_id);
            println!("rule_type: {}", info.rule_type);
            println!("node_id:   {}", info.node_id);
        }
        Commands::ParseLimit { limit } => {
            let parsed = parse_limits(&limit);
            if parsed.is_empty() {
                println!("no limits");
            }
            for directive in &parsed.speed_limits {
                println!("limiter:  {}", directive);
            }
            for directive in &parsed.conn_limits {
                println!("climiter: {}", directive);
            }
        }
        Commands::Snapshot => {
            let api = gost(&cli.gost, cli.timeout)?;
            let snapshot = api.fetch_config().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Services => {
            let api = gost(&cli.gost, cli.timeout)?;
            let mut services = api.fetch_config().await?.services;
            services.sort_by(|a, b| a.name.cmp(&b.name));

            println!("{:<40} {:>8} {:<8} {:>6} {:<8}", "SERVICE", "RULE", "TYPE", "NODE", "ADDR");
            for svc in services {
                match parse_rule_info(&svc.name) {
                    Ok(info) => println!(
                        "{:<40} {:>8} {:<8} {:>6} {:<8}",
                        svc.name, info.rule_id, info.rule_type, info.node_id, svc.addr
                    ),
                    Err(_) => println!("{:<40} {:>8} {:<8} {:>6} {:<8}", svc.name, "-", "-", "-", svc.addr),
                }
            }
        }
    }

    Ok(())
}

fn gost(endpoint: &str, timeout: u64) -> Result<GostApi, Box<dyn std::error::Error>> {
    let client = http_client(&TimeoutConfig { request_secs: timeout })?;
    Ok(GostApi::new(client, parse_endpoint("gost", endpoint)?))
}
