use arkive_core::{Collection, Record, RemoteFeed, Snapshot};
use chrono::Local;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::OutputFormat;
use crate::config::Config;
use crate::sync::WsFeed;
use crate::workspace::Workspace;

/// Follow the remote feed and print every reconciled snapshot
#[derive(Args)]
pub struct WatchCommand {
    /// Collections to follow (default: all)
    #[arg(value_name = "COLLECTION")]
    pub collections: Vec<Collection>,

    /// Feed URL (overrides sync.feed_url)
    #[arg(long)]
    pub url: Option<String>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl WatchCommand {
    pub async fn run(
        &self,
        workspace: &mut Workspace,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let url = self
            .url
            .as_ref()
            .or(config.sync.feed_url.as_ref())
            .ok_or("No feed configured. Set sync.feed_url or pass --url.")?;

        let feed: Arc<dyn RemoteFeed> = Arc::new(WsFeed::connect(url).await?);
        workspace.attach(feed)?;

        let selected = if self.collections.is_empty() {
            Collection::ALL.to_vec()
        } else {
            self.collections.clone()
        };

        let printers: Vec<JoinHandle<()>> = selected
            .iter()
            .map(|collection| match collection {
                Collection::Clients => print_changes(workspace.clients.watch(), &self.format),
                Collection::Receipts => print_changes(workspace.receipts.watch(), &self.format),
                Collection::Expenses => print_changes(workspace.expenses.watch(), &self.format),
                Collection::Notifications => {
                    print_changes(workspace.notifications.watch(), &self.format)
                }
                Collection::Documents => print_changes(workspace.documents.watch(), &self.format),
                Collection::Activities => print_changes(workspace.activities.watch(), &self.format),
            })
            .collect();

        eprintln!(
            "Watching {} (merge policy: {}). Press Ctrl-C to stop.",
            selected
                .iter()
                .map(Collection::name)
                .collect::<Vec<_>>()
                .join(", "),
            config.sync.merge_policy
        );

        tokio::signal::ctrl_c().await?;

        for printer in printers {
            printer.abort();
        }
        workspace.teardown();
        Ok(())
    }
}

fn print_changes<R: Record>(
    mut rx: watch::Receiver<Snapshot<R>>,
    format: &OutputFormat,
) -> JoinHandle<()> {
    let format = format.clone();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            if snapshot.is_loading {
                continue;
            }
            match format {
                OutputFormat::Json => {
                    let line = serde_json::json!({
                        "collection": R::COLLECTION,
                        "count": snapshot.len(),
                        "records": &*snapshot.records,
                    });
                    println!("{}", line);
                }
                OutputFormat::Text => {
                    let newest = snapshot.records.first().map_or("-", |r| r.id());
                    println!(
                        "[{}] {}: {} record(s), newest {}",
                        Local::now().format("%H:%M:%S"),
                        R::COLLECTION,
                        snapshot.len(),
                        newest
                    );
                }
            }
        }
    })
}
