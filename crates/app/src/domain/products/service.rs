//! Products service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::products::{
        data::NewProduct,
        errors::ProductsServiceError,
        records::{ProductRecord, ProductUuid},
        repository::PgProductsRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgProductsService {
    db: Db,
    repository: PgProductsRepository,
}

impl PgProductsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgProductsRepository::new(),
        }
    }
}

#[async_trait]
impl ProductsService for PgProductsService {
    async fn list_products(&self) -> Result<Vec<ProductRecord>, ProductsServiceError> {
        let mut tx = self.db.begin().await?;

        let products = self.repository.list_products(&mut tx).await?;

        tx.commit().await?;

        Ok(products)
    }

    async fn get_product(
        &self,
        product: ProductUuid,
    ) -> Result<ProductRecord, ProductsServiceError> {
        let mut tx = self.db.begin().await?;

        let product = self.repository.get_product(&mut tx, product).await?;

        tx.commit().await?;

        Ok(product)
    }

    async fn create_product(
        &self,
        product: NewProduct,
    ) -> Result<ProductRecord, ProductsServiceError> {
        if product.name.trim().is_empty() {
            return Err(ProductsServiceError::BlankName);
        }

        if product.price.is_sign_negative() {
            return Err(ProductsServiceError::NegativePrice);
        }

        let mut tx = self.db.begin().await?;

        let created = self.repository.create_product(&mut tx, product).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn restock(
        &self,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<ProductRecord, ProductsServiceError> {
        if quantity == 0 {
            return Err(ProductsServiceError::ZeroQuantity);
        }

        let mut tx = self.db.begin().await?;

        if !self
            .repository
            .credit_stock(&mut tx, product, quantity)
            .await?
        {
            return Err(ProductsServiceError::NotFound);
        }

        let restocked = self.repository.get_product(&mut tx, product).await?;

        tx.commit().await?;

        Ok(restocked)
    }
}

#[automock]
#[async_trait]
pub trait ProductsService: Send + Sync {
    /// Retrieves all live products with their availability.
    async fn list_products(&self) -> Result<Vec<ProductRecord>, ProductsServiceError>;

    /// Retrieve a single product.
    async fn get_product(&self, product: ProductUuid)
    -> Result<ProductRecord, ProductsServiceError>;

    /// Creates a new product with an opening stock level.
    async fn create_product(
        &self,
        product: NewProduct,
    ) -> Result<ProductRecord, ProductsServiceError>;

    /// Adds units to a product's stock.
    async fn restock(
        &self,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<ProductRecord, ProductsServiceError>;
}
