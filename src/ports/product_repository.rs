//! Product catalog port.
//!
//! Products are never deleted. Deactivating one stops new checkouts but
//! keeps existing orders and tokens redeemable.

use async_trait::async_trait;

use crate::domain::catalog::Product;
use crate::domain::foundation::{DomainError, ProductId};

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Save a product, replacing any product with the same ID.
    async fn save(&self, product: &Product) -> Result<(), DomainError>;

    /// Find a product by ID, active or not.
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, DomainError>;

    /// Sets the active flag. Returns false if the product does not exist.
    async fn set_active(&self, id: &ProductId, active: bool) -> Result<bool, DomainError>;
}
