use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use storynest::app::App;
use storynest::models::{Config, ImageProvider, Language, StoryLength, StoryRequest, Theme};
use storynest::poller::PollConfig;
use storynest::render;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "storynest")]
#[command(about = "Generate an illustrated children's story")]
struct CliArgs {
    /// Child's name.
    #[arg(long, default_value = "Aiden")]
    name: String,

    /// Child's favorite animal.
    #[arg(long, default_value = "Rabbit")]
    animal: String,

    /// Adventure, Friendship, Magic, Mystery, Courage or Exploration.
    #[arg(long, default_value = "adventure")]
    theme: Theme,

    /// Short, medium or long.
    #[arg(long, default_value = "short")]
    length: StoryLength,

    /// Language name or ISO 639-1 code.
    #[arg(long, default_value = "english")]
    language: Language,

    /// Overrides IMAGE_PROVIDER (openai or leonardo).
    #[arg(long)]
    image_provider: Option<ImageProvider>,

    /// Overrides POLL_MAX_ATTEMPTS.
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Overrides POLL_INTERVAL_SECS.
    #[arg(long)]
    interval_secs: Option<u64>,
}

impl CliArgs {
    fn story_request(&self) -> StoryRequest {
        StoryRequest {
            name: self.name.clone(),
            favorite_animal: self.animal.clone(),
            theme: self.theme,
            length: self.length,
            language: self.language,
        }
    }

    fn poll_config(&self, base: PollConfig) -> storynest::Result<PollConfig> {
        PollConfig::new(
            self.max_attempts.unwrap_or(base.max_attempts()),
            self.interval_secs
                .map(Duration::from_secs)
                .unwrap_or(base.interval()),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storynest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting storynest");

    let args = CliArgs::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(provider) = args.image_provider {
        config = config.with_image_provider(provider);
    }
    let poll = args.poll_config(config.poll)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling remaining work");
                cancel.cancel();
            }
        });
    }

    let app = match App::new(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    match app.run(&args.story_request(), &poll, cancel).await {
        Ok(book) => {
            let path = render::write_story_book(&book, app.output_dir())?;
            info!("Story complete: {}", path.display());
            println!("{}", path.display());
            Ok(())
        }
        Err(e) => {
            error!("Story generation failed: {}", e);
            std::process::exit(1);
        }
    }
}
