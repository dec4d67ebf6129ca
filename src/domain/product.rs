use super::money::Balance;
use super::record::Record;
use crate::error::{RentalError, Result};
use serde::{Deserialize, Serialize};

pub type ProductId = u32;

/// A rentable vehicle in the catalog.
///
/// `stock` is tracked for display and administration; rentals neither check
/// nor decrement it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Price per rental day.
    pub rental_price: Balance,
    pub stock: u32,
    pub category: String,
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rental_price: Balance,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category: String,
}

impl NewProduct {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RentalError::InvalidInput(
                "product name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            rental_price: self.rental_price,
            stock: self.stock,
            category: self.category,
        }
    }
}

/// Partial product update. Absent fields keep their current value.
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub rental_price: Option<Balance>,
    pub stock: Option<u32>,
    pub category: Option<String>,
}

impl ProductPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            return Err(RentalError::InvalidInput(
                "product name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(rental_price) = self.rental_price {
            product.rental_price = rental_price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
    }
}

/// A product together with every rental record that references it.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct ProductWithRecords {
    #[serde(flatten)]
    pub product: Product,
    pub records: Vec<Record>,
}
