mod activity;
mod client;
mod document;
mod expense;
mod notification;
mod receipt;

pub use activity::{Activity, ActivityDraft};
pub use client::{Client, ClientDraft, ClientType};
pub use document::{AccessAction, AccessLogEntry, Document, DocumentDraft, DocumentKind};
pub use expense::{Expense, ExpenseCategory, ExpenseDraft};
pub use notification::{Notification, NotificationDraft, NotificationKind};
pub use receipt::{PaymentMethod, Receipt, ReceiptDraft};
