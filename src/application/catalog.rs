use super::settle;
use crate::domain::ports::{RepositoryTx, SharedRepository};
use crate::domain::product::{NewProduct, Product, ProductId, ProductPatch, ProductWithRecords};
use crate::domain::record::Record;
use crate::error::Result;
use tracing::{info, warn};

/// Product catalog administration.
#[derive(Clone)]
pub struct CatalogService {
    repository: SharedRepository,
}

impl CatalogService {
    pub fn new(repository: SharedRepository) -> Self {
        Self { repository }
    }

    pub async fn create_product(&self, product: NewProduct) -> Result<Product> {
        product.validate()?;
        let product = self.repository.insert_product(product).await?;
        info!(product_id = product.id, name = %product.name, "product created");
        Ok(product)
    }

    pub async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<ProductWithRecords> {
        patch.validate()?;
        let mut product = self.repository.get_product(id).await?;
        patch.apply(&mut product);
        self.repository.update_product(product).await?;
        info!(product_id = id, "product updated");
        self.get_product(id).await
    }

    pub async fn get_product(&self, id: ProductId) -> Result<ProductWithRecords> {
        let product = self.repository.get_product(id).await?;
        let records = self.repository.records_for_product(id).await?;
        Ok(ProductWithRecords { product, records })
    }

    pub async fn list_products(&self) -> Result<Vec<ProductWithRecords>> {
        let mut listing = Vec::new();
        for product in self.repository.list_products().await? {
            let records = self.repository.records_for_product(product.id).await?;
            listing.push(ProductWithRecords { product, records });
        }
        Ok(listing)
    }

    /// Deletes a product and every rental record that references it, in one
    /// transaction. Returns how many records went with it.
    pub async fn delete_product(&self, id: ProductId) -> Result<usize> {
        let ProductWithRecords { records, .. } = self.get_product(id).await?;

        let mut tx = self.repository.begin().await?;
        let outcome = stage_cascade(tx.as_mut(), id, &records).await;
        settle(tx, outcome).await.inspect_err(|e| {
            warn!(product_id = id, error = %e, "product deletion aborted");
        })?;

        info!(product_id = id, records = records.len(), "product deleted");
        Ok(records.len())
    }
}

async fn stage_cascade(tx: &mut dyn RepositoryTx, id: ProductId, records: &[Record]) -> Result<()> {
    for record in records {
        tx.delete_record(record.id).await?;
    }
    tx.delete_product(id).await
}
