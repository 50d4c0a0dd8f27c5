use super::render;
use crate::{Context, Error};

/// Show the state of your current caption job
#[poise::command(slash_command, rename = "captions-status")]
pub async fn captions_status(ctx: Context<'_>) -> Result<(), Error> {
    let text = match ctx.data().existing_controller(ctx.author().id.get()) {
        Some(controller) => render::status(&controller.snapshot()),
        None => "You have not requested any captions yet. Use `/captions` with a video.".to_string(),
    };

    ctx.say(text).await?;
    Ok(())
}
