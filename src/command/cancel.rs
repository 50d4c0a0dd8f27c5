use tracing::info;

use crate::{Context, Error};

/// Stop waiting for your current caption job
#[poise::command(slash_command, rename = "captions-cancel")]
pub async fn captions_cancel(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id.get();
    let abandoned = ctx
        .data()
        .existing_controller(user_id)
        .is_some_and(|controller| controller.cancel());

    if abandoned {
        info!(user_id, "Caption job canceled by user");
        ctx.say("Caption job canceled.").await?;
    } else {
        ctx.say("No caption job in progress.").await?;
    }
    Ok(())
}
