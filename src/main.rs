use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use tracing::info;

use yt_audio_converter::core::tools::{check_required_tools, log_tool_status};
use yt_audio_converter::{web, AppConfig, AppState, NAME, VERSION};

const USAGE: &str = "Usage: yt-audio-converter [--host <addr>] [--port <port>] [--config <path>]";

/// Command line overrides for the server
#[derive(Debug, Default, PartialEq)]
struct ServerArgs {
    host: Option<String>,
    port: Option<u16>,
    config: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<ServerArgs> {
    let mut parsed = ServerArgs::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("{} requires a value", flag))
        };

        match arg.as_str() {
            "--host" => parsed.host = Some(value("--host")?),
            "--port" => {
                let raw = value("--port")?;
                let port = raw
                    .parse::<u16>()
                    .with_context(|| format!("Invalid port: {}", raw))?;
                parsed.port = Some(port);
            }
            "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other => bail!("Unknown argument: {}\n{}", other, USAGE),
        }
    }

    Ok(parsed)
}

#[rocket::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(error) => {
            eprintln!("Error: {error:#}");
            std::process::exit(2);
        }
    };

    let mut config = AppConfig::load_or_default(args.config.as_deref());
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    yt_audio_converter::init(&config.logging.level)?;
    info!("🚀 Starting {} v{}", NAME, VERSION);

    log_tool_status(&check_required_tools(&config).await);

    let state = AppState::new(config).context("Failed to initialize application state")?;
    info!(
        "🌐 Listening on http://{}:{}",
        state.config.server.host, state.config.server.port
    );

    let figment = web::figment(&state);
    web::build_rocket(state, figment)
        .launch()
        .await
        .context("Web server terminated with an error")?;

    info!("👋 Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_all_flags() {
        let parsed = parse_args(&strings(&[
            "--host", "0.0.0.0", "--port", "9000", "--config", "/etc/ytac.json",
        ]))
        .unwrap();

        assert_eq!(
            parsed,
            ServerArgs {
                host: Some("0.0.0.0".into()),
                port: Some(9000),
                config: Some(PathBuf::from("/etc/ytac.json")),
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_args(&strings(&["--port", "http"])).is_err());
        assert!(parse_args(&strings(&["--port"])).is_err());
        assert!(parse_args(&strings(&["--verbose"])).is_err());
        assert_eq!(parse_args(&[]).unwrap(), ServerArgs::default());
    }
}
