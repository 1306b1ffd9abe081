use arkive_core::{Expense, ExpenseCategory, ExpenseDraft};
use clap::{Args, Subcommand};
use std::collections::BTreeMap;

use super::{confirm, parse_date, truncate, OutputFormat};
use crate::config::Config;
use crate::workspace::Workspace;

#[derive(Args)]
pub struct ExpenseCommand {
    #[command(subcommand)]
    pub command: ExpenseSubcommand,
}

#[derive(Subcommand)]
pub enum ExpenseSubcommand {
    /// Record an office expense
    Add {
        /// What the money was spent on
        description: String,

        /// Amount spent
        #[arg(long)]
        amount: f64,

        /// Category (office, utilities, rent, salary, travel, other)
        #[arg(long, default_value = "other")]
        category: ExpenseCategory,

        /// Expense date (YYYY-MM-DD), defaults to today
        #[arg(long, value_parser = parse_date)]
        date: Option<chrono::DateTime<chrono::Utc>>,
    },

    /// List expenses, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only expenses in this category
        #[arg(long)]
        category: Option<ExpenseCategory>,
    },

    /// Totals per category
    Summary,

    /// Delete an expense
    Delete {
        /// Expense ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl ExpenseCommand {
    pub async fn run(
        &self,
        workspace: &Workspace,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ExpenseSubcommand::Add {
                description,
                amount,
                category,
                date,
            } => {
                if description.trim().is_empty() {
                    return Err("Expense description cannot be empty".into());
                }
                if *amount <= 0.0 {
                    return Err("Amount must be a positive number".into());
                }

                let mut draft =
                    ExpenseDraft::new(description.trim(), *amount, &config.created_by.value)
                        .with_category(*category);
                if let Some(date) = date {
                    draft = draft.with_date(*date);
                }

                let created = workspace.expenses.create(draft).await?;
                println!("Recorded expense:");
                println!("{}", created);
                Ok(())
            }

            ExpenseSubcommand::List { format, category } => {
                let snapshot = workspace.expenses.snapshot();
                let expenses: Vec<&Expense> = snapshot
                    .records
                    .iter()
                    .filter(|e| category.map_or(true, |c| e.category == c))
                    .collect();

                if expenses.is_empty() {
                    println!("No expenses found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&expenses)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<36}  {:<10}  {:<30}  {:<10}  {:>12}",
                            "ID", "DATE", "DESCRIPTION", "CATEGORY", "AMOUNT"
                        );
                        println!("{}", "-".repeat(106));
                        for expense in &expenses {
                            println!(
                                "{:<36}  {:<10}  {:<30}  {:<10}  {:>12.2}",
                                expense.id,
                                expense.date.format("%Y-%m-%d"),
                                truncate(&expense.description, 30),
                                expense.category.to_string(),
                                expense.amount
                            );
                        }
                        let total: f64 = expenses.iter().map(|e| e.amount).sum();
                        println!("\nTotal: {} expense(s), {:.2}", expenses.len(), total);
                    }
                }
                Ok(())
            }

            ExpenseSubcommand::Summary => {
                let snapshot = workspace.expenses.snapshot();
                let mut totals: BTreeMap<String, f64> = BTreeMap::new();
                for expense in snapshot.records.iter() {
                    *totals.entry(expense.category.to_string()).or_default() += expense.amount;
                }

                if totals.is_empty() {
                    println!("No expenses found");
                    return Ok(());
                }

                for (category, total) in &totals {
                    println!("{:<10}  {:>12.2}", category, total);
                }
                println!("{}", "-".repeat(24));
                println!("{:<10}  {:>12.2}", "total", totals.values().sum::<f64>());
                Ok(())
            }

            ExpenseSubcommand::Delete { id, force } => {
                let expense = workspace
                    .expenses
                    .get(id)
                    .ok_or_else(|| format!("Expense not found: {}", id))?;

                if !force && !confirm(&format!("Delete expense '{}'?", expense.description))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                workspace.expenses.delete(&expense.id).await?;
                println!("Deleted expense: {}", expense.description);
                Ok(())
            }
        }
    }
}
