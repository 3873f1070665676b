//! In-memory product catalog.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::catalog::Product;
use crate::domain::foundation::{DomainError, ProductId};
use crate::ports::ProductRepository;

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog pre-filled with `products`.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            products: RwLock::new(products),
        }
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn save(&self, product: &Product) -> Result<(), DomainError> {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, DomainError> {
        Ok(self.products.read().await.get(id).cloned())
    }

    async fn set_active(&self, id: &ProductId, active: bool) -> Result<bool, DomainError> {
        let mut products = self.products.write().await;
        match products.get_mut(id) {
            Some(product) => {
                product.is_active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
