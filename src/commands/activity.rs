use clap::{Args, Subcommand};

use super::{truncate, OutputFormat};
use crate::workspace::Workspace;

#[derive(Args)]
pub struct ActivityCommand {
    #[command(subcommand)]
    pub command: ActivitySubcommand,
}

#[derive(Subcommand)]
pub enum ActivitySubcommand {
    /// Show the activity log, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Show at most this many entries
        #[arg(long, short = 'n', default_value = "50")]
        limit: usize,

        /// Only entries by this user
        #[arg(long)]
        user: Option<String>,
    },
}

impl ActivityCommand {
    pub async fn run(&self, workspace: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ActivitySubcommand::List {
                format,
                limit,
                user,
            } => {
                let snapshot = workspace.activities.snapshot();
                let activities: Vec<_> = snapshot
                    .records
                    .iter()
                    .filter(|a| user.as_ref().map_or(true, |u| &a.user_id == u))
                    .take(*limit)
                    .collect();

                if activities.is_empty() {
                    println!("No activity recorded");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&activities)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<16}  {:<12}  {:<18}  DETAILS", "WHEN", "USER", "ACTION");
                        println!("{}", "-".repeat(100));
                        for activity in &activities {
                            println!(
                                "{:<16}  {:<12}  {:<18}  {}",
                                activity.timestamp.format("%Y-%m-%d %H:%M"),
                                truncate(&activity.user_id, 12),
                                truncate(&activity.action, 18),
                                truncate(&activity.details, 48)
                            );
                        }
                        println!("\nTotal: {} entries", activities.len());
                    }
                }
                Ok(())
            }
        }
    }
}
