use anyhow::Context;
use clap::{Parser, Subcommand};
use umb_rs::constants::{UMB_CHANNEL_MAX, UMB_CHANNEL_MIN, UMB_DEFAULT_ADDRESS, UMB_DEFAULT_BAUDRATE};
use umb_rs::umb::serial::SerialConfig;
use umb_rs::{init_logger, ChannelValue, ClientConfig, StatusCode, UmbDeviceHandle};

#[derive(Parser)]
#[command(name = "umb-cli")]
#[command(about = "CLI tool for the Lufft UMB weather-station protocol")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query sensor channels and print a JSON map of channel to value
    Query {
        port: String,
        channels: Vec<u16>,
        #[arg(short, long, default_value_t = UMB_DEFAULT_ADDRESS)]
        address: u8,
        #[arg(short, long, default_value_t = UMB_DEFAULT_BAUDRATE)]
        baudrate: u32,
        /// Pack all channels into a single combined request
        #[arg(long)]
        combined: bool,
        /// Print the full result list as JSON instead of the value map
        #[arg(long)]
        json: bool,
    },
    /// Explain a numeric device status code
    Status { code: u8 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();
    match cli.command {
        Commands::Query {
            port,
            channels,
            address,
            baudrate,
            combined,
            json,
        } => {
            let mut valid = Vec::with_capacity(channels.len());
            for channel in channels {
                if (UMB_CHANNEL_MIN..=UMB_CHANNEL_MAX).contains(&channel) {
                    valid.push(channel);
                } else {
                    eprintln!("Skipping channel {channel}: outside the queryable range");
                }
            }

            let serial = SerialConfig {
                baudrate,
                ..SerialConfig::default()
            };
            let config = ClientConfig {
                address,
                ..ClientConfig::default()
            };
            let mut handle = UmbDeviceHandle::connect_with_config(&port, serial, config)
                .await
                .with_context(|| format!("failed to open serial port {port}"))?;

            let results = if combined {
                handle.query_multi_combined(&valid).await?
            } else {
                handle.query_multi(&valid).await?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                let mut map = serde_json::Map::new();
                for result in &results {
                    if result.is_ok() {
                        map.insert(result.channel.to_string(), value_to_json(&result.value));
                    } else {
                        eprintln!("On channel {} got bad {}", result.channel, result.status);
                    }
                }
                println!("{}", serde_json::Value::Object(map));
            }
        }
        Commands::Status { code } => {
            println!("Status: {}", StatusCode::from_raw(code));
        }
    }

    Ok(())
}

fn value_to_json(value: &ChannelValue) -> serde_json::Value {
    match value {
        ChannelValue::Integer(v) => (*v).into(),
        ChannelValue::Float(v) => serde_json::json!(v),
        ChannelValue::Boolean(v) => (*v).into(),
        ChannelValue::NoData => serde_json::Value::Null,
    }
}
