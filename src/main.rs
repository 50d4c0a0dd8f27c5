use anyhow::Context as _;
use dashmap::DashMap;
use dotenvy::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod command;
mod config;
mod controller;
mod transcription;

use command::{captions, captions_cancel, captions_export, captions_status};
use config::{AppConfig, ProviderConfig};
use controller::{CaptionController, PollConfig};
use transcription::provider::caption_api::CaptionApiConfig;
use transcription::{
    CaptionApiProvider, StatusPoller, TranscriptionProvider as _, Transliterator as _, UploadSubmitter,
};

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub struct Data {
    /// One caption session per Discord user
    pub controllers: DashMap<u64, Arc<CaptionController>>,
    pub submitter: UploadSubmitter,
    pub poller: StatusPoller,
    pub poll_config: PollConfig,
}

impl Data {
    pub fn controller_for(&self, user_id: u64) -> Arc<CaptionController> {
        self.controllers
            .entry(user_id)
            .or_insert_with(|| {
                Arc::new(CaptionController::new(
                    self.submitter.clone(),
                    self.poller.clone(),
                    self.poll_config.clone(),
                ))
            })
            .clone()
    }

    pub fn existing_controller(&self, user_id: u64) -> Option<Arc<CaptionController>> {
        self.controllers.get(&user_id).map(|c| c.value().clone())
    }
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => panic!("Failed to start bot: {:?}", error),
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
            if let Err(e) = ctx.say(format!("**Error:** {}", error)).await {
                error!("Failed to report command error: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e)
            }
        }
    }
}

async fn check_caption_api(config: &AppConfig) -> anyhow::Result<()> {
    let ProviderConfig::CaptionApi { base_url } = &config.provider else {
        return Ok(());
    };

    let api = CaptionApiProvider::new(
        CaptionApiConfig::new(base_url.as_str()).with_timeout(config.http_timeout),
    )
    .context("Failed to create caption API client")?;

    match api.health().await {
        Ok(true) => info!(%base_url, "Caption API is healthy"),
        Ok(false) => warn!(%base_url, "Caption API health check did not report ok"),
        Err(e) => warn!(%base_url, "Caption API unreachable: {}", e),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    let provider = config
        .build_provider()
        .context("Failed to create transcription provider")?;
    let transliterator = config.build_transliterator();
    info!(
        provider = provider.name(),
        transliterator = transliterator.name(),
        poll_interval_secs = config.poll.interval.as_secs(),
        max_attempts = config.poll.max_attempts,
        "Transcription backend configured"
    );

    check_caption_api(&config).await?;

    let submitter = UploadSubmitter::new(provider.clone(), config.max_upload_bytes);
    let poller = StatusPoller::new(provider, transliterator);
    let poll_config = config.poll.clone();
    let guild_id = config.guild_id;

    let options = poise::FrameworkOptions {
        commands: vec![captions(), captions_status(), captions_cancel(), captions_export()],
        on_error: |error| Box::pin(on_error(error)),
        pre_command: |ctx| {
            Box::pin(async move {
                info!("Executing command {}...", ctx.command().qualified_name);
            })
        },
        post_command: |ctx| {
            Box::pin(async move {
                info!("Executed command {}!", ctx.command().qualified_name);
            })
        },
        ..Default::default()
    };

    let framework = poise::Framework::builder()
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                if let Some(guild_id) = guild_id {
                    let guild_id = serenity::GuildId::new(guild_id);
                    poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id)
                        .await?;
                    info!("Registered commands for guild {}", guild_id);
                }

                Ok(Data {
                    controllers: DashMap::new(),
                    submitter,
                    poller,
                    poll_config,
                })
            })
        })
        .options(options)
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .context("Failed to create Discord client")?;

    client.start().await?;
    Ok(())
}
