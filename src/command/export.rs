use poise::CreateReply;
use poise::serenity_prelude as serenity;

use super::options::FormatChoice;
use super::render;
use crate::transcription::ExportFormat;
use crate::{Context, Error};

/// Download your latest captions in another format
#[poise::command(slash_command, rename = "captions-export")]
pub async fn captions_export(
    ctx: Context<'_>,
    #[description = "File format (default: SRT)"] format: Option<FormatChoice>,
) -> Result<(), Error> {
    let format: ExportFormat = format.map(Into::into).unwrap_or(ExportFormat::Srt);

    let exported = ctx
        .data()
        .existing_controller(ctx.author().id.get())
        .and_then(|controller| controller.export(format));

    let Some(content) = exported else {
        ctx.say("No finished captions to export. Run `/captions` first.").await?;
        return Ok(());
    };

    let attachment = serenity::CreateAttachment::bytes(
        content.into_bytes(),
        render::export_filename("captions", format),
    );
    ctx.send(CreateReply::default().attachment(attachment)).await?;
    Ok(())
}
