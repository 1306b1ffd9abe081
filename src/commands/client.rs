use arkive_core::{Client, ClientDraft, ClientType};
use clap::{Args, Subcommand};

use super::{confirm, truncate, OutputFormat};
use crate::config::Config;
use crate::workspace::Workspace;

#[derive(Args)]
pub struct ClientCommand {
    #[command(subcommand)]
    pub command: ClientSubcommand,
}

#[derive(Subcommand)]
pub enum ClientSubcommand {
    /// Register a new client
    Create {
        /// Client name
        name: String,

        /// National identity number
        #[arg(long)]
        cnic: String,

        /// Email address
        #[arg(long)]
        email: Option<String>,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,

        /// Portal the client is registered with (IRIS, SECP, PRA, Other)
        #[arg(long = "type", value_name = "TYPE", default_value = "Other")]
        client_type: ClientType,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List clients, most recently updated first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only clients of this type
        #[arg(long = "type", value_name = "TYPE")]
        client_type: Option<ClientType>,
    },

    /// Show a client's details
    Show {
        /// Client ID or CNIC
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update an existing client
    Update {
        /// Client ID or CNIC
        identifier: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long = "type", value_name = "TYPE")]
        client_type: Option<ClientType>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a client
    Delete {
        /// Client ID or CNIC
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

/// Finds a client in the reconciled view by id, then by CNIC.
pub(crate) fn find_client(workspace: &Workspace, identifier: &str) -> Option<Client> {
    workspace.clients.get(identifier).or_else(|| {
        workspace
            .clients
            .snapshot()
            .records
            .iter()
            .find(|c| c.cnic == identifier)
            .cloned()
    })
}

impl ClientCommand {
    pub async fn run(
        &self,
        workspace: &Workspace,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ClientSubcommand::Create {
                name,
                cnic,
                email,
                phone,
                client_type,
                notes,
            } => {
                if name.trim().is_empty() {
                    return Err("Client name cannot be empty".into());
                }
                if find_client(workspace, cnic).is_some() {
                    return Err(format!("A client with CNIC {} already exists", cnic).into());
                }

                let mut draft = ClientDraft::new(name.trim(), cnic.trim()).with_type(*client_type);
                if let Some(email) = email {
                    draft = draft.with_email(email);
                }
                if let Some(phone) = phone {
                    draft = draft.with_phone(phone);
                }
                if let Some(notes) = notes {
                    draft = draft.with_notes(notes);
                }

                let created = workspace.clients.create(draft).await?;
                println!("Created client:");
                println!("{}", created);
                Ok(())
            }

            ClientSubcommand::List {
                format,
                client_type,
            } => {
                let snapshot = workspace.clients.snapshot();
                let clients: Vec<&Client> = snapshot
                    .records
                    .iter()
                    .filter(|c| client_type.map_or(true, |t| c.client_type == t))
                    .collect();

                if clients.is_empty() {
                    println!("No clients found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&clients)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  {:<30}  {:<15}  TYPE", "ID", "NAME", "CNIC");
                        println!("{}", "-".repeat(95));
                        for client in &clients {
                            println!(
                                "{:<36}  {:<30}  {:<15}  {}",
                                client.id,
                                truncate(&client.name, 30),
                                client.cnic,
                                client.client_type
                            );
                        }
                        println!("\nTotal: {} client(s)", clients.len());
                    }
                }
                Ok(())
            }

            ClientSubcommand::Show { identifier, format } => {
                let client = find_client(workspace, identifier)
                    .ok_or_else(|| format!("Client not found: {}", identifier))?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&client)?);
                    }
                    OutputFormat::Text => {
                        print!("{}", client);
                        let receipts = workspace.receipts_by_client(&client.cnic).await;
                        let documents = workspace.documents_by_client(&client.cnic).await;
                        let billed: f64 = receipts.iter().map(|r| r.amount).sum();
                        println!("Receipts: {} (total {:.2})", receipts.len(), billed);
                        println!("Documents: {}", documents.len());
                    }
                }
                Ok(())
            }

            ClientSubcommand::Update {
                identifier,
                name,
                email,
                phone,
                client_type,
                notes,
            } => {
                let has_updates = name.is_some()
                    || email.is_some()
                    || phone.is_some()
                    || client_type.is_some()
                    || notes.is_some();

                if !has_updates {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let mut client = find_client(workspace, identifier)
                    .ok_or_else(|| format!("Client not found: {}", identifier))?;

                if let Some(new_name) = name {
                    client.name = new_name.clone();
                }
                if let Some(new_email) = email {
                    client.email = Some(new_email.clone());
                }
                if let Some(new_phone) = phone {
                    client.phone = Some(new_phone.clone());
                }
                if let Some(new_type) = client_type {
                    client.client_type = *new_type;
                }
                if let Some(new_notes) = notes {
                    client.notes = Some(new_notes.clone());
                }

                let updated = workspace.clients.update(client).await?;
                println!("Updated client:");
                println!("{}", updated);
                Ok(())
            }

            ClientSubcommand::Delete { identifier, force } => {
                let client = find_client(workspace, identifier)
                    .ok_or_else(|| format!("Client not found: {}", identifier))?;

                if !force && !confirm(&format!("Delete client '{}'?", client.name))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                workspace.clients.delete(&client.id).await?;
                let details = format!(
                    "Deleted client {} (ID: {}) - CNIC: {}",
                    client.name, client.id, client.cnic
                );
                workspace
                    .record_activity(&config.created_by.value, "delete_client", &details)
                    .await;
                println!("Deleted client: {}", client.name);
                Ok(())
            }
        }
    }
}
