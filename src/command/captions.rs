use poise::CreateReply;
use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

use super::options::{LanguageChoice, TaskChoice};
use super::render;
use crate::controller::{Captions, Outcome};
use crate::transcription::{ExportFormat, Language, MediaFile, Task, TranscriptionRequest};
use crate::{Context, Error};

/// Generate captions for a video
///
/// Uploads the attachment to the transcription service, keeps the reply
/// updated while the job runs and posts the captions as `.srt` and `.txt`
/// files once it finishes. A new request replaces any job still running.
#[poise::command(slash_command, rename = "captions")]
pub async fn captions(
    ctx: Context<'_>,
    #[description = "Video to caption (mp4, mov, avi, mkv or webm)"] file: serenity::Attachment,
    #[description = "Spoken language (default: English)"] language: Option<LanguageChoice>,
    #[description = "What to produce (default: transcribe)"] task: Option<TaskChoice>,
) -> Result<(), Error> {
    let data = ctx.data();
    let user_id = ctx.author().id.get();
    let language: Language = language.map(Into::into).unwrap_or(Language::English);
    let task: Task = task.map(Into::into).unwrap_or(Task::Transcribe);

    let limit = data.submitter.max_upload_bytes();
    if u64::from(file.size) > limit {
        ctx.say(format!(
            "**Captioning failed:** File is larger than the {} MB upload limit",
            limit / (1024 * 1024)
        ))
        .await?;
        return Ok(());
    }

    ctx.defer().await?;

    let bytes = file.download().await?;
    let mut media = MediaFile::new(file.filename.clone(), bytes);
    if let Some(content_type) = &file.content_type {
        media = media.with_content_type(content_type.as_str());
    }
    let request = TranscriptionRequest::new(Some(media), language, task);

    if let Err(e) = data.submitter.validate(&request) {
        ctx.say(format!("**Captioning failed:** {}", e)).await?;
        return Ok(());
    }

    info!(user_id, file = %file.filename, %language, %task, "Caption request");

    let controller = data.controller_for(user_id);
    let mut updates = controller.subscribe();
    let reply = ctx.say("**Uploading video...**").await?;
    let mut shown = String::new();

    let run = controller.generate(request);
    tokio::pin!(run);

    let outcome = loop {
        tokio::select! {
            outcome = &mut run => break outcome,
            changed = updates.changed() => {
                if changed.is_err() {
                    break (&mut run).await;
                }
                let text = render::progress(&updates.borrow_and_update());
                if text != shown {
                    // the job keeps running even if Discord rejects an edit
                    match reply.edit(ctx, CreateReply::default().content(text.as_str())).await {
                        Ok(()) => shown = text,
                        Err(e) => warn!(user_id, "Failed to update caption progress: {}", e),
                    }
                }
            }
        }
    };

    match outcome {
        Outcome::Completed(Captions { segments, language }) => {
            let header = match language {
                Some(detected) => format!(
                    "**Captions ready!** {} segments (language: {})",
                    segments.len(),
                    detected
                ),
                None => format!("**Captions ready!** {} segments", segments.len()),
            };
            reply
                .edit(
                    ctx,
                    CreateReply::default().content(format!("{}\n{}", header, render::preview(&segments))),
                )
                .await?;

            let attachments = [ExportFormat::Srt, ExportFormat::Text].map(|format| {
                serenity::CreateAttachment::bytes(
                    format.render(&segments).into_bytes(),
                    render::export_filename(&file.filename, format),
                )
            });
            let [srt, txt] = attachments;
            ctx.send(CreateReply::default().attachment(srt).attachment(txt))
                .await?;
        }
        Outcome::Failed(e) => {
            error!(user_id, kind = %e.kind(), "Captioning failed: {}", e);
            reply
                .edit(ctx, CreateReply::default().content(format!("**Captioning failed:** {}", e)))
                .await?;
        }
        Outcome::Superseded => {
            reply
                .edit(
                    ctx,
                    CreateReply::default().content("Caption job was replaced or canceled."),
                )
                .await?;
        }
    }

    Ok(())
}
