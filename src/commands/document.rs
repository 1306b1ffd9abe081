use arkive_core::{AccessAction, Document, DocumentDraft, DocumentKind};
use clap::{Args, Subcommand};

use super::{confirm, truncate, OutputFormat};
use crate::config::Config;
use crate::workspace::Workspace;

#[derive(Args)]
pub struct DocumentCommand {
    #[command(subcommand)]
    pub command: DocumentSubcommand,
}

#[derive(Subcommand)]
pub enum DocumentSubcommand {
    /// Register an uploaded document for a client
    Add {
        /// Client CNIC
        cnic: String,

        /// File name
        file_name: String,

        /// Document type (cnic, tax_return, financial_statement, contract, other)
        #[arg(long = "type", value_name = "TYPE", default_value = "other")]
        kind: DocumentKind,

        /// MIME type
        #[arg(long)]
        file_type: Option<String>,

        /// Size in bytes
        #[arg(long)]
        size: Option<u64>,

        /// Tags (can be repeated)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },

    /// List documents, most recently uploaded first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only documents for this client CNIC
        #[arg(long)]
        client: Option<String>,
    },

    /// Show a document and its access log
    Show {
        /// Document ID
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Record that a document was viewed or downloaded
    Access {
        /// Document ID
        id: String,

        /// Action (view, download)
        #[arg(long, default_value = "view")]
        action: AccessAction,
    },

    /// Delete a document
    Delete {
        /// Document ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl DocumentCommand {
    pub async fn run(
        &self,
        workspace: &Workspace,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            DocumentSubcommand::Add {
                cnic,
                file_name,
                kind,
                file_type,
                size,
                tags,
            } => {
                if file_name.trim().is_empty() {
                    return Err("File name cannot be empty".into());
                }

                let mut draft = DocumentDraft::new(cnic, file_name.trim(), &config.created_by.value)
                    .with_kind(*kind);
                if let Some(file_type) = file_type {
                    draft = draft.with_file_type(file_type);
                }
                if let Some(size) = size {
                    draft = draft.with_file_size(*size);
                }
                if !tags.is_empty() {
                    draft = draft.with_tags(tags.clone());
                }

                let created = workspace.documents.create(draft).await?;
                println!("Registered document:");
                println!("{}", created);
                Ok(())
            }

            DocumentSubcommand::List { format, client } => {
                let documents: Vec<Document> = match client {
                    Some(cnic) => workspace.documents_by_client(cnic).await,
                    None => workspace.documents.snapshot().records.to_vec(),
                };

                if documents.is_empty() {
                    println!("No documents found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&documents)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<36}  {:<30}  {:<15}  {:<20}  UPLOADED",
                            "ID", "FILE", "CLIENT", "TYPE"
                        );
                        println!("{}", "-".repeat(120));
                        for document in &documents {
                            println!(
                                "{:<36}  {:<30}  {:<15}  {:<20}  {}",
                                document.id,
                                truncate(&document.file_name, 30),
                                document.client_cnic,
                                document.kind.to_string(),
                                document.uploaded_at.format("%Y-%m-%d")
                            );
                        }
                        println!("\nTotal: {} document(s)", documents.len());
                    }
                }
                Ok(())
            }

            DocumentSubcommand::Show { id, format } => {
                let document = workspace
                    .documents
                    .get(id)
                    .ok_or_else(|| format!("Document not found: {}", id))?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&document)?);
                    }
                    OutputFormat::Text => {
                        print!("{}", document);
                    }
                }
                Ok(())
            }

            DocumentSubcommand::Access { id, action } => {
                let document = workspace
                    .log_document_access(id, &config.created_by.value, *action)
                    .await?;
                println!(
                    "Logged {} of '{}' by {}",
                    action, document.file_name, config.created_by.value
                );
                Ok(())
            }

            DocumentSubcommand::Delete { id, force } => {
                let document = workspace
                    .documents
                    .get(id)
                    .ok_or_else(|| format!("Document not found: {}", id))?;

                if !force && !confirm(&format!("Delete document '{}'?", document.file_name))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                workspace.documents.delete(&document.id).await?;
                println!("Deleted document: {}", document.file_name);
                Ok(())
            }
        }
    }
}
