//! Product entity - a sellable digital good.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ProductId, Timestamp, ValidationError};

/// A downloadable product.
///
/// Immutable once created except for `is_active`. Deactivating a product
/// stops new checkouts (enforced where checkouts are opened) but existing
/// orders and tokens for it keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,

    /// Processor-side product identifier.
    pub processor_product_id: String,

    /// Processor-side price identifier.
    pub processor_price_id: String,

    pub title: String,
    pub description: String,

    /// Storage path of the deliverable file, relative to the protected root.
    pub file_path: String,

    /// File name presented to the buyer.
    pub file_name: String,

    /// Public URL where the product can be bought.
    pub buy_url: Option<String>,

    pub is_active: bool,
    pub created_at: Timestamp,
}

/// Fields required to register a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub id: ProductId,
    pub processor_product_id: String,
    pub processor_price_id: String,
    pub title: String,
    pub description: String,
    pub file_path: String,
    pub file_name: String,
    pub buy_url: Option<String>,
}

impl Product {
    /// Creates an active product.
    pub fn create(new: NewProduct) -> Result<Self, ValidationError> {
        if new.title.trim().is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        if new.file_name.trim().is_empty() {
            return Err(ValidationError::empty_field("file_name"));
        }
        validate_file_path(&new.file_path)?;

        Ok(Self {
            id: new.id,
            processor_product_id: new.processor_product_id,
            processor_price_id: new.processor_price_id,
            title: new.title,
            description: new.description,
            file_path: new.file_path,
            file_name: new.file_name,
            buy_url: new.buy_url,
            is_active: true,
            created_at: Timestamp::now(),
        })
    }
}

/// File paths are relative and may not climb out of the protected root.
fn validate_file_path(path: &str) -> Result<(), ValidationError> {
    if path.trim().is_empty() {
        return Err(ValidationError::empty_field("file_path"));
    }
    if path.starts_with('/') || path.split('/').any(|segment| segment == "..") {
        return Err(ValidationError::invalid_format(
            "file_path",
            "must be relative without '..' segments",
        ));
    }
    Ok(())
}
