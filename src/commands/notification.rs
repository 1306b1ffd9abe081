use arkive_core::{Notification, NotificationDraft, NotificationKind};
use clap::{Args, Subcommand};

use super::{truncate, OutputFormat};
use crate::workspace::Workspace;

#[derive(Args)]
pub struct NotificationCommand {
    #[command(subcommand)]
    pub command: NotificationSubcommand,
}

#[derive(Subcommand)]
pub enum NotificationSubcommand {
    /// Post a notification
    Add {
        /// Notification text
        message: String,

        /// Type (info, warning, success, error)
        #[arg(long = "type", value_name = "TYPE", default_value = "info")]
        kind: NotificationKind,
    },

    /// List notifications, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only unread notifications
        #[arg(long)]
        unread: bool,
    },

    /// Mark a notification as read
    Read {
        /// Notification ID
        id: String,
    },

    /// Mark every notification as read
    ReadAll,
}

impl NotificationCommand {
    pub async fn run(&self, workspace: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            NotificationSubcommand::Add { message, kind } => {
                if message.trim().is_empty() {
                    return Err("Notification message cannot be empty".into());
                }

                let created = workspace
                    .notifications
                    .create(NotificationDraft::new(message.trim(), *kind))
                    .await?;
                println!("Posted notification {}", created.id);
                Ok(())
            }

            NotificationSubcommand::List { format, unread } => {
                let snapshot = workspace.notifications.snapshot();
                let notifications: Vec<&Notification> = snapshot
                    .records
                    .iter()
                    .filter(|n| !unread || !n.read)
                    .collect();

                if notifications.is_empty() {
                    println!("No notifications");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&notifications)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  {:<16}  {:<8}  MESSAGE", "ID", "CREATED", "TYPE");
                        println!("{}", "-".repeat(100));
                        for n in &notifications {
                            let marker = if n.read { " " } else { "*" };
                            println!(
                                "{:<36}  {:<16}  {:<8}  {}{}",
                                n.id,
                                n.created_at.format("%Y-%m-%d %H:%M"),
                                n.kind.to_string(),
                                marker,
                                truncate(&n.message, 50)
                            );
                        }
                        let unread_count = notifications.iter().filter(|n| !n.read).count();
                        println!(
                            "\nTotal: {} notification(s), {} unread",
                            notifications.len(),
                            unread_count
                        );
                    }
                }
                Ok(())
            }

            NotificationSubcommand::Read { id } => {
                if workspace.mark_notification_read(id).await {
                    println!("Marked {} as read", id);
                } else {
                    println!("Could not mark {} as read", id);
                }
                Ok(())
            }

            NotificationSubcommand::ReadAll => {
                let count = workspace.mark_all_notifications_read().await?;
                println!("Marked {} notification(s) as read", count);
                Ok(())
            }
        }
    }
}
