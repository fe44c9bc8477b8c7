use anyhow::{anyhow, Context, Result};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

use feedwatch_core::build_initiation_request;
use feedwatch_pg::{
    connect_store, ensure_table, redact_connection_string, ChangefeedStream, PgResult,
    WriteGenerator, WriteGeneratorConfig,
};

use crate::config::RunSettings;
use crate::output;

type WriterHandle = JoinHandle<PgResult<u64>>;

/// Why the consume loop stopped.
enum Exit {
    Interrupted,
    FeedEnded,
    WriterStopped(Result<PgResult<u64>, JoinError>),
}

/// Run the write generator and the changefeed consumer until Ctrl-C, the end
/// of the feed, or the first fatal error in either of them.
pub async fn run(settings: RunSettings) -> Result<()> {
    info!(
        database = %redact_connection_string(&settings.connection_string),
        table = %settings.table,
        cursor = ?settings.cursor.as_ref().map(|c| c.as_str()),
        writer = settings.writer_enabled,
        "Starting feedwatch"
    );

    // Dedicated session for bootstrap and writes.
    let writer_client = connect_store(&settings.connection_string)
        .await
        .context("Failed to connect writer session")?;
    ensure_table(&writer_client, &settings.table)
        .await
        .context("Failed to create watched table")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut writer = if settings.writer_enabled {
        let generator = WriteGenerator::new(
            writer_client,
            WriteGeneratorConfig {
                table: settings.table.clone(),
                interval: settings.write_interval,
            },
        )?;
        Some(tokio::spawn(generator.run(shutdown_rx)))
    } else {
        None
    };

    // Stop the writer on every exit path; a feed failure is reported before a writer failure.
    let exit = consume(&settings, writer.as_mut()).await;
    let (consumed, writer_result, stopped_early) = match exit {
        Ok(Exit::WriterStopped(result)) => (Ok(()), Some(result), true),
        other => {
            let _ = shutdown_tx.send(true);
            let writer_result = match writer.take() {
                Some(handle) => Some(handle.await),
                None => None,
            };
            (other.map(log_exit), writer_result, false)
        }
    };

    consumed?;
    check_writer(writer_result, stopped_early)
}

fn log_exit(exit: Exit) {
    match exit {
        Exit::Interrupted => info!("Interrupted, shutting down"),
        Exit::FeedEnded => info!("Changefeed closed by server"),
        Exit::WriterStopped(_) => {}
    }
}

async fn consume(settings: &RunSettings, writer: Option<&mut WriterHandle>) -> Result<Exit> {
    let request = build_initiation_request(&settings.table, settings.cursor.clone());

    let feed_client = connect_store(&settings.connection_string)
        .await
        .context("Failed to connect changefeed session")?;

    output::print_statement(&request);
    let mut feed = ChangefeedStream::open(&feed_client, &request)
        .await
        .context("Failed to open changefeed")?;

    let writer_done = async move {
        match writer {
            Some(handle) => handle.await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(writer_done);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            item = feed.next() => {
                let Some(item) = item.context("Changefeed failed")? else {
                    return Ok(Exit::FeedEnded);
                };
                output::print_raw(&item.raw);
                output::print_event(&item.event, feed.current_cursor());
            }
            result = &mut writer_done => {
                return Ok(Exit::WriterStopped(result));
            }
            _ = &mut ctrl_c => {
                return Ok(Exit::Interrupted);
            }
        }
    }
}

/// Turn the writer task outcome into an error when it failed, or when it
/// stopped without being asked to.
fn check_writer(
    result: Option<Result<PgResult<u64>, JoinError>>,
    stopped_early: bool,
) -> Result<()> {
    match result {
        None => Ok(()),
        Some(Ok(Ok(written))) if !stopped_early => {
            info!(written, "Write generator finished");
            Ok(())
        }
        Some(Ok(Ok(written))) => Err(anyhow!(
            "Write generator stopped unexpectedly after {} rows",
            written
        )),
        Some(Ok(Err(e))) => {
            error!(error = %e, "Write generator failed");
            Err(e).context("Write generator failed")
        }
        Some(Err(e)) => Err(e).context("Write generator task panicked"),
    }
}
