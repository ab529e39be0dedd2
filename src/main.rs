use clap::{Parser, Subcommand};
use rphoto::{
    logger::{self, LoggerConfig},
    server, GeminiProvider, RenderedResult, StudioClient, StudioConfig,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "rphoto", version, about = "Face-swap photo studio")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the studio web server (default).
    Serve,
    /// Submit a selfie and a template to a running studio.
    Generate {
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server: String,
        #[arg(long)]
        selfie: PathBuf,
        #[arg(long)]
        template: String,
        #[arg(long)]
        prompt: Option<String>,
        /// Output file stem; the extension follows the image type.
        #[arg(long, default_value = "result")]
        out: PathBuf,
    },
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();
    let config = StudioConfig::from_env();
    logger::init_with_config(LoggerConfig::for_environment(config.production))?;

    if env_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    match Cli::parse().command.unwrap_or(Command::Serve) {
        Command::Serve => {
            logger::log_startup_info(
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                &config.host,
                config.port,
            );
            logger::log_config_info(&config);
            if !config.gemini.has_credentials() {
                log::warn!("⚠️  No API key set; generation requests will fail with 500");
            }

            let provider = Arc::new(GeminiProvider::new(config.gemini.clone()));
            server::run_server(&config, provider).await?;
        }
        Command::Generate {
            server,
            selfie,
            template,
            prompt,
            out,
        } => {
            let client = StudioClient::new(server);
            let result = client.submit(&selfie, &template, prompt.as_deref()).await?;
            match &result {
                RenderedResult::Image(source) if source.starts_with("data:") => {
                    let path = result.save_image(&out).await?;
                    log::info!("💾 Image saved to: {}", path.display());
                }
                RenderedResult::Image(url) => println!("{}", url),
                RenderedResult::Text { text, note } => {
                    println!("{}", text);
                    if let Some(note) = note {
                        log::warn!("⚠️  {}", note);
                    }
                }
            }
        }
    }

    Ok(())
}
