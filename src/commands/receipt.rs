use arkive_core::{PaymentMethod, Receipt, ReceiptDraft};
use clap::{Args, Subcommand};

use super::client::find_client;
use super::{confirm, parse_date, truncate, OutputFormat};
use crate::config::Config;
use crate::workspace::Workspace;

#[derive(Args)]
pub struct ReceiptCommand {
    #[command(subcommand)]
    pub command: ReceiptSubcommand,
}

#[derive(Subcommand)]
pub enum ReceiptSubcommand {
    /// Issue a receipt to a client
    Create {
        /// Client ID or CNIC
        client: String,

        /// Amount received
        #[arg(long)]
        amount: f64,

        /// Work the payment is for
        #[arg(long = "work", value_name = "DESCRIPTION")]
        nature_of_work: Option<String>,

        /// Payment method (cash, bank_transfer, cheque, card, online)
        #[arg(long = "method", value_name = "METHOD", default_value = "cash")]
        payment_method: PaymentMethod,

        /// Receipt date (YYYY-MM-DD), defaults to today
        #[arg(long, value_parser = parse_date)]
        date: Option<chrono::DateTime<chrono::Utc>>,
    },

    /// List receipts, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only receipts for this client CNIC
        #[arg(long)]
        client: Option<String>,
    },

    /// Show a receipt
    Show {
        /// Receipt ID
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Change the amount or details of a receipt
    Update {
        /// Receipt ID
        id: String,

        #[arg(long)]
        amount: Option<f64>,

        #[arg(long = "work", value_name = "DESCRIPTION")]
        nature_of_work: Option<String>,

        #[arg(long = "method", value_name = "METHOD")]
        payment_method: Option<PaymentMethod>,
    },

    /// Delete a receipt
    Delete {
        /// Receipt ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl ReceiptCommand {
    pub async fn run(
        &self,
        workspace: &Workspace,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ReceiptSubcommand::Create {
                client,
                amount,
                nature_of_work,
                payment_method,
                date,
            } => {
                if *amount <= 0.0 {
                    return Err("Amount must be a positive number".into());
                }
                let client = find_client(workspace, client)
                    .ok_or_else(|| format!("Client not found: {}", client))?;

                let mut draft =
                    ReceiptDraft::new(&client.name, &client.cnic, *amount, &config.created_by.value)
                        .with_payment_method(*payment_method);
                if let Some(work) = nature_of_work {
                    draft = draft.with_nature_of_work(work);
                }
                if let Some(date) = date {
                    draft = draft.with_date(*date);
                }

                let created = workspace.receipts.create(draft).await?;
                println!("Created receipt:");
                println!("{}", created);
                Ok(())
            }

            ReceiptSubcommand::List { format, client } => {
                let receipts: Vec<Receipt> = match client {
                    Some(cnic) => workspace.receipts_by_client(cnic).await,
                    None => workspace.receipts.snapshot().records.to_vec(),
                };

                if receipts.is_empty() {
                    println!("No receipts found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&receipts)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<36}  {:<10}  {:<24}  {:>12}  METHOD",
                            "ID", "DATE", "CLIENT", "AMOUNT"
                        );
                        println!("{}", "-".repeat(100));
                        for receipt in &receipts {
                            println!(
                                "{:<36}  {:<10}  {:<24}  {:>12.2}  {}",
                                receipt.id,
                                receipt.date.format("%Y-%m-%d"),
                                truncate(&receipt.client_name, 24),
                                receipt.amount,
                                receipt.payment_method
                            );
                        }
                        let total: f64 = receipts.iter().map(|r| r.amount).sum();
                        println!("\nTotal: {} receipt(s), {:.2}", receipts.len(), total);
                    }
                }
                Ok(())
            }

            ReceiptSubcommand::Show { id, format } => {
                let receipt = workspace
                    .receipts
                    .get(id)
                    .ok_or_else(|| format!("Receipt not found: {}", id))?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&receipt)?);
                    }
                    OutputFormat::Text => {
                        print!("{}", receipt);
                    }
                }
                Ok(())
            }

            ReceiptSubcommand::Update {
                id,
                amount,
                nature_of_work,
                payment_method,
            } => {
                if amount.is_none() && nature_of_work.is_none() && payment_method.is_none() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let mut receipt = workspace
                    .receipts
                    .get(id)
                    .ok_or_else(|| format!("Receipt not found: {}", id))?;

                if let Some(amount) = amount {
                    if *amount <= 0.0 {
                        return Err("Amount must be a positive number".into());
                    }
                    receipt.amount = *amount;
                }
                if let Some(work) = nature_of_work {
                    receipt.nature_of_work = work.clone();
                }
                if let Some(method) = payment_method {
                    receipt.payment_method = *method;
                }

                let updated = workspace.receipts.update(receipt).await?;
                println!("Updated receipt:");
                println!("{}", updated);
                Ok(())
            }

            ReceiptSubcommand::Delete { id, force } => {
                let receipt = workspace
                    .receipts
                    .get(id)
                    .ok_or_else(|| format!("Receipt not found: {}", id))?;

                if !force
                    && !confirm(&format!(
                        "Delete receipt of {:.2} for '{}'?",
                        receipt.amount, receipt.client_name
                    ))?
                {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                workspace.receipts.delete(&receipt.id).await?;
                println!("Deleted receipt: {}", receipt.id);
                Ok(())
            }
        }
    }
}
