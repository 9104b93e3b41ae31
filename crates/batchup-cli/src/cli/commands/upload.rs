//! `batchup upload` – queue files and run the scheduler until every upload settles.

use anyhow::{Context, Result};
use batchup_core::config::UploaderConfig;
use batchup_core::queue::{FileSource, QueueSnapshot, UploadStatus};
use batchup_core::{CurlTransport, UploadScheduler};
use std::path::PathBuf;
use std::time::{Duration, Instant};

const PROGRESS_INTERVAL_MS: u64 = 500;
/// How long Ctrl-C waits for cancelled transfers to report back.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub struct UploadArgs {
    pub files: Vec<PathBuf>,
    pub jobs: Option<usize>,
    pub endpoint: Option<String>,
    pub retries: u32,
}

pub async fn run_upload(mut cfg: UploaderConfig, args: UploadArgs) -> Result<()> {
    if let Some(jobs) = args.jobs {
        cfg.concurrency = jobs;
    }
    let transport = match &args.endpoint {
        Some(endpoint) => {
            let url = url_arg(endpoint)?;
            CurlTransport::new(url, cfg.field_name.clone(), cfg.curl_or_default())
        }
        None => CurlTransport::from_config(&cfg)?,
    };
    tracing::info!(endpoint = transport.endpoint(), "uploading {} file(s)", args.files.len());

    let mut sources = Vec::with_capacity(args.files.len());
    for path in &args.files {
        sources.push(FileSource::from_path(path)?);
    }

    let (progress_tx, progress_rx) = tokio::sync::mpsc::channel::<QueueSnapshot>(64);
    let progress_handle = tokio::spawn(print_progress(progress_rx));

    let mut scheduler = UploadScheduler::new(&cfg, transport).with_observer(progress_tx);
    scheduler.add_files(sources);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut interrupted = drive(&mut scheduler, &mut ctrl_c).await;
    let mut round = 0;
    while !interrupted && round < args.retries && scheduler.stats().error > 0 {
        round += 1;
        let requeued = scheduler.retry_all_failed();
        println!("Retry {}/{}: re-queued {} failed upload(s)", round, args.retries, requeued);
        interrupted = drive(&mut scheduler, &mut ctrl_c).await;
    }

    if interrupted {
        scheduler.shutdown(SHUTDOWN_GRACE).await;
    }

    let snapshot = scheduler.snapshot();
    drop(scheduler);
    let _ = progress_handle.await;
    print_table(&snapshot);

    if interrupted {
        anyhow::bail!("interrupted");
    }
    let failed = snapshot.stats.error;
    if failed > 0 {
        anyhow::bail!("{} of {} upload(s) failed", failed, snapshot.items.len());
    }
    Ok(())
}

fn url_arg(endpoint: &str) -> Result<url::Url> {
    url::Url::parse(endpoint).with_context(|| format!("invalid --endpoint {:?}", endpoint))
}

/// Apply scheduler events until idle. Returns true if Ctrl-C arrived first.
async fn drive<F>(
    scheduler: &mut UploadScheduler<CurlTransport>,
    ctrl_c: &mut std::pin::Pin<&mut F>,
) -> bool
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    scheduler.reconcile();
    while !scheduler.is_idle() {
        tokio::select! {
            applied = scheduler.next_event() => {
                if !applied {
                    break;
                }
            }
            _ = ctrl_c.as_mut() => {
                tracing::info!("interrupted");
                return true;
            }
        }
    }
    false
}

async fn print_progress(mut rx: tokio::sync::mpsc::Receiver<QueueSnapshot>) {
    let mut last_print: Option<Instant> = None;
    while let Some(snapshot) = rx.recv().await {
        let now = Instant::now();
        let due = last_print
            .map(|t| now.duration_since(t).as_millis() as u64 >= PROGRESS_INTERVAL_MS)
            .unwrap_or(true);
        if !due && !snapshot.stats.is_settled() {
            continue;
        }
        let stats = &snapshot.stats;
        let speeds: Vec<String> = snapshot
            .items
            .iter()
            .filter(|it| it.status == UploadStatus::Active && !it.speed.is_empty())
            .map(|it| format!("{} {}", it.name, it.speed))
            .collect();
        println!(
            "  {:.1}%  done {}/{}  active {}  pending {}  failed {}  {}",
            stats.fraction() * 100.0,
            stats.success,
            stats.item_count(),
            stats.active,
            stats.pending,
            stats.error,
            speeds.join(", ")
        );
        last_print = Some(now);
    }
}

fn print_table(snapshot: &QueueSnapshot) {
    println!(
        "{:<5} {:<8} {:>10} {:>8}  {:<32} {}",
        "ID", "STATUS", "SIZE", "TRIES", "NAME", "DETAIL"
    );
    for item in &snapshot.items {
        let detail = match item.status {
            UploadStatus::Success => item
                .response
                .as_ref()
                .and_then(|r| r.url())
                .unwrap_or("")
                .to_string(),
            UploadStatus::Error => item.error.clone().unwrap_or_default(),
            _ => format!("{:.0}%", item.progress),
        };
        println!(
            "{:<5} {:<8} {:>10} {:>8}  {:<32} {}",
            item.id.get(),
            item.status.as_str(),
            item.total,
            item.attempts,
            item.name,
            detail.lines().next().unwrap_or("")
        );
    }
}
