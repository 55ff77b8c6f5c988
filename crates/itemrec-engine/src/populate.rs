//! Push every catalog vector to the remote index.
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{error, info};

use itemrec_vector::{ItemMetadata, RemoteIndexClient, UpsertRecord};

use crate::context::AppContext;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulateReport {
    pub total: usize,
    pub upserted: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub degraded: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct PopulateOptions {
    pub batch_size: usize,
    pub delay: Duration,
    pub show_progress: bool,
}

impl AppContext {
    pub fn populate_options(&self) -> PopulateOptions {
        PopulateOptions {
            batch_size: self.settings.remote.upsert_batch_size,
            delay: Duration::from_millis(self.settings.remote.upsert_delay_ms),
            show_progress: true,
        }
    }

    /// Embed the catalog (through the cache) and upsert it in batches.
    /// A failed batch is logged and skipped.
    pub async fn populate_remote(&self, client: &RemoteIndexClient, opts: PopulateOptions) -> anyhow::Result<PopulateReport> {
        let table = {
            let ctx = self.clone();
            tokio::task::spawn_blocking(move || ctx.cache.get_or_populate(&ctx.catalog)).await?
        };
        let items = self.catalog.items();
        let batch_size = opts.batch_size.max(1);
        let mut report = PopulateReport { total: table.len(), degraded: table.degraded_count(), ..Default::default() };

        let pb = if opts.show_progress { ProgressBar::new(table.len() as u64) } else { ProgressBar::hidden() };
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} items ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let n_batches = table.len().div_ceil(batch_size);
        for (b, (entries, batch_items)) in table.entries().chunks(batch_size).zip(items.chunks(batch_size)).enumerate() {
            let records: Vec<UpsertRecord> = entries
                .iter()
                .zip(batch_items)
                .map(|(entry, item)| UpsertRecord {
                    id: entry.item_id.clone(),
                    values: entry.vector.clone(),
                    metadata: ItemMetadata::from_item(item),
                })
                .collect();
            report.batches += 1;
            match client.upsert(&records).await {
                Ok(count) => {
                    report.upserted += count;
                    info!(batch = b + 1, of = n_batches, upserted = count, "batch upserted");
                }
                Err(e) => {
                    report.failed_batches += 1;
                    error!(batch = b + 1, of = n_batches, error = %e, "batch upsert failed, skipping");
                }
            }
            pb.inc(records.len() as u64);
            if !opts.delay.is_zero() && b + 1 < n_batches {
                tokio::time::sleep(opts.delay).await;
            }
        }
        pb.finish_with_message("done");
        info!(
            upserted = report.upserted,
            failed_batches = report.failed_batches,
            "remote index population finished"
        );
        Ok(report)
    }
}
