/// Upload → HTML conversion pipeline.
///
/// Downloads the uploaded `.txt` into a per-job directory, converts it,
/// replies with the HTML document and removes the directory again whatever
/// the outcome.
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{Document, InputFile, MessageId, ParseMode};
use teloxide::utils::html;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use linkdeck_shared::db;
use linkdeck_shared::models::{ConversionStats, ConversionStatus};
use linkdeck_shared::{Converter, LinkdeckError, LinkdeckResult};

use crate::commands::AppState;

/// Build the per-user, per-job working directory path.
/// Structure: <download_dir>/<chat_id>/<job_id>/
pub fn job_dir(base: &Path, chat_id: i64, job_id: &str) -> PathBuf {
    base.join(chat_id.to_string()).join(job_id)
}

/// Whether an uploaded file name looks like a text list.
pub fn is_txt_file(file_name: Option<&str>) -> bool {
    file_name
        .map(|n| n.to_ascii_lowercase().ends_with(".txt"))
        .unwrap_or(false)
}

/// File name without its extension; used as the page title.
pub fn file_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "links".to_string())
}

/// Caption sent with the generated HTML.
pub fn success_caption(
    stem: &str,
    stats: &ConversionStats,
    credit: Option<&str>,
    credit_url: Option<&str>,
) -> String {
    let mut caption = format!(
        "✅ <b>Successfully Done!</b>\n<blockquote><b>{}</b></blockquote>\n\
         🎬 Videos: {} | 📄 PDFs: {} | 🔗 Others: {}\n\
         ❖ <b>Open in Chrome.</b> ❖",
        html::escape(stem),
        stats.videos,
        stats.pdfs,
        stats.others,
    );
    if let Some(credit) = credit {
        let credit = html::escape(credit);
        match credit_url {
            Some(url) => caption.push_str(&format!(
                "\n\n📥 Extracted By ➤ <a href=\"{}\">{}</a>",
                html::escape(url),
                credit
            )),
            None => caption.push_str(&format!("\n\n📥 Extracted By ➤ <b>{}</b>", credit)),
        }
    }
    caption
}

/// Whether an upload of `size` bytes is over the configured limit.
pub fn exceeds_limit(size: u64, max: u64) -> bool {
    size > max
}

/// Text shown to the user when a job fails.
pub fn failure_text(err: &anyhow::Error) -> String {
    match err.downcast_ref::<LinkdeckError>() {
        Some(le) => le.user_message(),
        None => format!("Conversion failed: {}", err),
    }
}

/// Queue and run a conversion for an uploaded document. The actual work runs
/// in a background task so the dispatcher is never blocked.
pub async fn start_conversion(
    bot: Bot,
    chat_id: ChatId,
    document: Document,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let file_name = document
        .file_name
        .clone()
        .unwrap_or_else(|| "links.txt".to_string());

    let size = document.file.size as u64;
    if exceeds_limit(size, state.config.max_file_bytes) {
        bot.send_message(
            chat_id,
            format!(
                "❌ File too large ({} KiB). The limit is {} KiB.",
                size / 1024,
                state.config.max_file_bytes / 1024
            ),
        )
        .await?;
        return Ok(());
    }

    let job_id = Uuid::new_v4().to_string();
    if !state.queue.enqueue(&job_id, chat_id.0, &file_name).await {
        bot.send_message(
            chat_id,
            "⏳ You already have a conversion in progress. Please wait for it to finish.",
        )
        .await?;
        return Ok(());
    }

    let status_msg = bot
        .send_message(chat_id, format!("⏳ Converting {} ...", file_name))
        .await?;

    tokio::spawn(async move {
        if let Err(e) =
            run_job(&bot, chat_id, status_msg.id, &job_id, &file_name, &document, &state).await
        {
            error!("Conversion job {} could not report back: {}", job_id, e);
        }
    });

    Ok(())
}

async fn run_job(
    bot: &Bot,
    chat_id: ChatId,
    status_msg_id: MessageId,
    job_id: &str,
    file_name: &str,
    document: &Document,
    state: &AppState,
) -> ResponseResult<()> {
    if !state.queue.acquire(job_id).await {
        bot.edit_message_text(chat_id, status_msg_id, "❌ Could not get a conversion slot.")
            .await?;
        return Ok(());
    }

    let dir = job_dir(&state.config.download_dir, chat_id.0, job_id);
    let stem = file_stem(file_name);
    let stem = stem.as_str();

    let outcome = in_job_dir(&dir, |dir| async move {
        let upload = download_upload(bot, &dir, document, stem).await?;
        let (html_path, stats) = write_and_convert(&dir, stem, &upload, &state.converter)?;
        deliver(bot, chat_id, &html_path, stem, &stats, state).await?;
        Ok::<_, anyhow::Error>(stats)
    })
    .await;

    match outcome {
        Ok(stats) => {
            if let Err(e) = bot.delete_message(chat_id, status_msg_id).await {
                debug!("Could not delete status message for job {}: {}", job_id, e);
            }
            state.queue.complete(job_id).await;
            record(state, job_id, chat_id.0, file_name, &stats, ConversionStatus::Done, None).await;
            info!("Job {} delivered {}.html to chat {}", job_id, stem, chat_id.0);
            Ok(())
        }
        Err(e) => {
            warn!("Job {} failed: {:#}", job_id, e);
            state.queue.fail(job_id).await;
            record(
                state,
                job_id,
                chat_id.0,
                file_name,
                &ConversionStats::default(),
                ConversionStatus::Error,
                Some(&format!("{:#}", e)),
            )
            .await;
            bot.edit_message_text(chat_id, status_msg_id, format!("❌ {}", failure_text(&e)))
                .await
                .map(|_| ())
        }
    }
}

/// Create the job directory, run `work` in it and remove the directory
/// afterwards whatever the outcome.
async fn in_job_dir<T, F, Fut>(dir: &Path, work: F) -> anyhow::Result<T>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let outcome = match tokio::fs::create_dir_all(dir).await {
        Ok(()) => work(dir.to_path_buf()).await,
        Err(e) => Err(anyhow::Error::new(e).context(format!("creating {}", dir.display()))),
    };

    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to clean up {}: {}", dir.display(), e);
        }
    }
    outcome
}

/// Fetch the uploaded document from Telegram into `<stem>.txt`.
async fn download_upload(
    bot: &Bot,
    dir: &Path,
    document: &Document,
    stem: &str,
) -> anyhow::Result<Vec<u8>> {
    let file = bot
        .get_file(document.file.id.clone())
        .await
        .map_err(|e| LinkdeckError::Telegram(format!("could not fetch the upload: {}", e)))?;

    let txt_path = dir.join(format!("{}.txt", stem));
    let mut dst = tokio::fs::File::create(&txt_path).await?;
    bot.download_file(&file.path, &mut dst)
        .await
        .map_err(|e| LinkdeckError::Telegram(format!("could not download the upload: {}", e)))?;
    dst.flush().await?;
    drop(dst);

    Ok(tokio::fs::read(&txt_path).await?)
}

/// Convert the upload and write `<stem>.html` into the job directory.
fn write_and_convert(
    dir: &Path,
    stem: &str,
    upload: &[u8],
    converter: &Converter,
) -> LinkdeckResult<(PathBuf, ConversionStats)> {
    let content = String::from_utf8_lossy(upload);
    let conversion = converter.convert(&content, stem)?;

    let html_path = dir.join(format!("{}.html", stem));
    std::fs::write(&html_path, conversion.html.as_bytes())?;
    Ok((html_path, conversion.stats))
}

/// Send the generated page back with its caption.
async fn deliver(
    bot: &Bot,
    chat_id: ChatId,
    html_path: &Path,
    stem: &str,
    stats: &ConversionStats,
    state: &AppState,
) -> LinkdeckResult<()> {
    let caption = success_caption(
        stem,
        stats,
        state.config.credit.as_deref(),
        state.config.credit_url.as_deref(),
    );
    bot.send_document(chat_id, InputFile::file(html_path))
        .caption(caption)
        .parse_mode(ParseMode::Html)
        .await
        .map_err(|e| LinkdeckError::Telegram(format!("could not send {}.html: {}", stem, e)))?;
    Ok(())
}

async fn record(
    state: &AppState,
    job_id: &str,
    chat_id: i64,
    file_name: &str,
    stats: &ConversionStats,
    status: ConversionStatus,
    error_msg: Option<&str>,
) {
    if let Some(pool) = &state.db_pool {
        if let Err(e) =
            db::record_conversion(pool, job_id, chat_id, file_name, stats, status, error_msg).await
        {
            warn!("Failed to record conversion {}: {}", job_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkdeck_shared::ConvertOptions;

    const LIST: &str = "(Physics) L1: https://x.io/l1.m3u8\nNotes: https://x.io/n.pdf\n";

    fn converter() -> Converter {
        Converter::new(ConvertOptions::default()).unwrap()
    }

    #[test]
    fn test_size_limit_boundary() {
        let max = 20 * 1024 * 1024;
        assert!(!exceeds_limit(0, max));
        assert!(!exceeds_limit(max, max));
        assert!(exceeds_limit(max + 1, max));
    }

    #[tokio::test]
    async fn test_job_dir_removed_after_success() {
        let base = tempfile::tempdir().unwrap();
        let dir = job_dir(base.path(), 7, "ok");

        let stats = in_job_dir(&dir, |dir| async move {
            let (html_path, stats) = write_and_convert(&dir, "batch", LIST.as_bytes(), &converter())?;
            assert!(html_path.exists());
            assert!(html_path.ends_with("batch.html"));
            Ok::<_, anyhow::Error>(stats)
        })
        .await
        .unwrap();

        assert_eq!(stats.videos, 1);
        assert_eq!(stats.pdfs, 1);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_job_dir_removed_after_failure() {
        let base = tempfile::tempdir().unwrap();
        let dir = job_dir(base.path(), 7, "empty");

        let err = in_job_dir(&dir, |dir| async move {
            std::fs::write(dir.join("batch.txt"), "no links here")?;
            let (_, stats) = write_and_convert(&dir, "batch", b"no links here", &converter())?;
            Ok::<_, anyhow::Error>(stats)
        })
        .await
        .unwrap_err();

        assert!(matches!(err.downcast_ref::<LinkdeckError>(), Some(LinkdeckError::NoEntries(_))));
        assert_eq!(failure_text(&err), "No links found. Each line must look like `Name: URL`.");
        assert!(!dir.exists());
        assert!(base.path().join("7").exists());
    }

    #[test]
    fn test_delivery_failure_text() {
        let err = anyhow::Error::new(LinkdeckError::Telegram(
            "could not send batch.html: A network error".into(),
        ));
        assert_eq!(
            failure_text(&err),
            "Telegram request failed: could not send batch.html: A network error"
        );

        let other = anyhow::anyhow!("disk full");
        assert_eq!(failure_text(&other), "Conversion failed: disk full");
    }

    #[test]
    fn test_job_dir_layout() {
        let dir = job_dir(Path::new("/tmp/dl"), 42, "abc");
        assert_eq!(dir, PathBuf::from("/tmp/dl/42/abc"));
    }

    #[test]
    fn test_is_txt_file() {
        assert!(is_txt_file(Some("batch.txt")));
        assert!(is_txt_file(Some("BATCH.TXT")));
        assert!(!is_txt_file(Some("batch.pdf")));
        assert!(!is_txt_file(Some("txt")));
        assert!(!is_txt_file(None));
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("UPSC Batch 2025.txt"), "UPSC Batch 2025");
        assert_eq!(file_stem("archive.tar.txt"), "archive.tar");
        assert_eq!(file_stem(".txt"), ".txt");
    }

    #[test]
    fn test_success_caption() {
        let stats = ConversionStats { entries: 5, videos: 3, pdfs: 1, others: 1, groups: 2 };
        let caption = success_caption("A & B", &stats, Some("Linkdeck"), Some("https://t.me/linkdeck"));
        assert!(caption.contains("<b>A &amp; B</b>"));
        assert!(caption.contains("Videos: 3 | 📄 PDFs: 1 | 🔗 Others: 1"));
        assert!(caption.contains(r#"<a href="https://t.me/linkdeck">Linkdeck</a>"#));

        let bare = success_caption("x", &stats, None, None);
        assert!(!bare.contains("Extracted By"));
    }
}
