use core::str::FromStr;

use serde::{Deserialize, Serialize};

use grantflow_auth::Module;
use grantflow_core::DomainError;

/// The transactional document types driven through the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Sale,
    PurchaseOrder,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Sale, DocumentKind::PurchaseOrder];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Sale => "sale",
            DocumentKind::PurchaseOrder => "purchase_order",
        }
    }

    /// Module whose grants gate this document's operations.
    pub fn module(&self) -> Module {
        match self {
            DocumentKind::Sale => Module::Sales,
            DocumentKind::PurchaseOrder => Module::Purchases,
        }
    }

    /// Module of the party a document of this kind references.
    pub fn counterparty(&self) -> Module {
        match self {
            DocumentKind::Sale => Module::Customer,
            DocumentKind::PurchaseOrder => Module::Supplier,
        }
    }
}

impl core::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sale" => Ok(DocumentKind::Sale),
            "purchase_order" | "purchaseorder" => Ok(DocumentKind::PurchaseOrder),
            _ => Err(DomainError::validation(format!("unknown document kind '{s}'"))),
        }
    }
}
