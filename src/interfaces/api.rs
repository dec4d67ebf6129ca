//! Framework-free request facade.
//!
//! Each method corresponds to one route of the public HTTP surface. It
//! authenticates the bearer credential where the route requires it, calls the
//! service, and turns failures into the `{Error, Details}` body plus a status
//! code. Mounting it on an HTTP framework is a matter of extracting the path,
//! body and `Authorization` header.
//!
//! | Route                  | Method           | Access   |
//! |------------------------|------------------|----------|
//! | `POST /users/register` | `register`       | public   |
//! | `POST /users/login`    | `login`          | public   |
//! | `POST /users/topup`    | `top_up`         | any user |
//! | `GET /users/`          | `list_users`     | admin    |
//! | `GET /users/:id`       | `get_user`       | admin    |
//! | `GET /products/`       | `list_products`  | any user |
//! | `GET /products/:id`    | `get_product`    | any user |
//! | `POST /products/`      | `create_product` | admin    |
//! | `PUT /products/:id`    | `update_product` | admin    |
//! | `DELETE /products/:id` | `delete_product` | admin    |
//! | `GET /rent/`           | `user_rents`     | any user |
//! | `POST /rent/`          | `rent`           | any user |

use crate::application::accounts::{
    AccountService, Credentials, Registration, Session, TopUpReceipt,
};
use crate::application::catalog::CatalogService;
use crate::application::notifications::{Notifications, Notified};
use crate::application::rental::{RentalReceipt, RentalService};
use crate::domain::ports::{Identity, SharedAuthGateway};
use crate::domain::product::{NewProduct, Product, ProductId, ProductPatch, ProductWithRecords};
use crate::domain::record::Record;
use crate::domain::user::{UserId, UserWithRecords};
use crate::error::RentalError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_UNAUTHORIZED: u16 = 401;
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

impl RentalError {
    pub fn status_code(&self) -> u16 {
        match self {
            RentalError::InvalidInput(_)
            | RentalError::NotFound { .. }
            | RentalError::InsufficientFunds { .. }
            | RentalError::CsvError(_) => STATUS_BAD_REQUEST,
            RentalError::Unauthorized(_) => STATUS_UNAUTHORIZED,
            RentalError::TransactionFailure(_)
            | RentalError::DeliveryError(_)
            | RentalError::IoError(_)
            | RentalError::InternalError(_) => STATUS_INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "Error")]
    pub error: String,
    #[serde(rename = "Details")]
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub body: ErrorResponse,
}

impl ApiError {
    fn new(error: RentalError, details: &str) -> Self {
        Self {
            status: error.status_code(),
            body: ErrorResponse {
                error: error.to_string(),
                details: details.to_string(),
            },
        }
    }
}

/// Returns a `map_err` adapter attaching an operator-facing hint.
fn fail(details: &'static str) -> impl FnOnce(RentalError) -> ApiError {
    move |error| ApiError::new(error, details)
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, Deserialize)]
pub struct TopUpRequest {
    pub deposit: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RentRequest {
    pub product_id: ProductId,
    pub rent_length: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub message: String,
}

#[derive(Clone)]
pub struct RentalApi {
    auth: SharedAuthGateway,
    accounts: AccountService,
    catalog: CatalogService,
    rentals: RentalService,
    notifications: Notifications,
}

impl RentalApi {
    pub fn new(
        auth: SharedAuthGateway,
        accounts: AccountService,
        catalog: CatalogService,
        rentals: RentalService,
        notifications: Notifications,
    ) -> Self {
        Self {
            auth,
            accounts,
            catalog,
            rentals,
            notifications,
        }
    }

    fn authenticate(&self, credential: &str) -> ApiResult<Identity> {
        self.auth
            .resolve_identity(credential)
            .map_err(fail("Authorization error"))
    }

    fn authorize_admin(&self, credential: &str) -> ApiResult<Identity> {
        let identity = self.authenticate(credential)?;
        if !identity.is_admin() {
            return Err(ApiError::new(
                RentalError::Unauthorized("user is not an admin".to_string()),
                "Unauthorized user",
            ));
        }
        Ok(identity)
    }

    pub async fn register(&self, registration: Registration) -> ApiResult<Notified<Session>> {
        let session = self
            .accounts
            .register(registration)
            .await
            .map_err(fail("Error registering user"))?;
        let notification = self
            .notifications
            .welcome(&session.user.email, &session.user.name)
            .await;
        Ok(Notified {
            value: session,
            notification,
        })
    }

    pub async fn login(&self, credentials: Credentials) -> ApiResult<Session> {
        self.accounts
            .login(credentials)
            .await
            .map_err(fail("Invalid email or password"))
    }

    pub async fn top_up(
        &self,
        credential: &str,
        request: TopUpRequest,
    ) -> ApiResult<Notified<TopUpReceipt>> {
        let identity = self.authenticate(credential)?;
        let receipt = self
            .accounts
            .top_up(identity.user_id, request.deposit)
            .await
            .map_err(fail("Error updating deposit"))?;
        let notification = self
            .notifications
            .top_up(&receipt.email, receipt.balance)
            .await;
        Ok(Notified {
            value: receipt,
            notification,
        })
    }

    pub async fn list_users(&self, credential: &str) -> ApiResult<Vec<UserWithRecords>> {
        self.authorize_admin(credential)?;
        self.accounts
            .list_users()
            .await
            .map_err(fail("Error retrieving data"))
    }

    pub async fn get_user(&self, credential: &str, id: UserId) -> ApiResult<UserWithRecords> {
        self.authorize_admin(credential)?;
        self.accounts
            .get_user(id)
            .await
            .map_err(fail("Error retrieving data"))
    }

    pub async fn list_products(&self, credential: &str) -> ApiResult<Vec<ProductWithRecords>> {
        self.authenticate(credential)?;
        self.catalog
            .list_products()
            .await
            .map_err(fail("Error retrieving data"))
    }

    pub async fn get_product(
        &self,
        credential: &str,
        id: ProductId,
    ) -> ApiResult<ProductWithRecords> {
        self.authenticate(credential)?;
        self.catalog
            .get_product(id)
            .await
            .map_err(fail("Error retrieving data"))
    }

    pub async fn create_product(
        &self,
        credential: &str,
        product: NewProduct,
    ) -> ApiResult<Product> {
        self.authorize_admin(credential)?;
        self.catalog
            .create_product(product)
            .await
            .map_err(fail("Error inserting data"))
    }

    pub async fn update_product(
        &self,
        credential: &str,
        id: ProductId,
        patch: ProductPatch,
    ) -> ApiResult<ProductWithRecords> {
        self.authorize_admin(credential)?;
        self.catalog
            .update_product(id, patch)
            .await
            .map_err(fail("Error updating data"))
    }

    pub async fn delete_product(&self, credential: &str, id: ProductId) -> ApiResult<Message> {
        self.authorize_admin(credential)?;
        self.catalog
            .delete_product(id)
            .await
            .map_err(fail("Error deleting product"))?;
        Ok(Message {
            message: "product successfully deleted".to_string(),
        })
    }

    pub async fn user_rents(&self, credential: &str) -> ApiResult<Vec<Record>> {
        let identity = self.authenticate(credential)?;
        self.rentals
            .user_rents(identity.user_id)
            .await
            .map_err(fail("Error retrieving data"))
    }

    pub async fn rent(
        &self,
        credential: &str,
        request: RentRequest,
    ) -> ApiResult<Notified<RentalReceipt>> {
        let identity = self.authenticate(credential)?;
        let receipt = self
            .rentals
            .rent_product(identity.user_id, request.product_id, request.rent_length)
            .await
            .map_err(|e| {
                let details = match e {
                    RentalError::InsufficientFunds { .. } => "Not enough deposit",
                    RentalError::TransactionFailure(_) => "Error recording rental",
                    _ => "Error creating rental",
                };
                ApiError::new(e, details)
            })?;
        let notification = self
            .notifications
            .rental(&receipt.email, receipt.balance)
            .await;
        Ok(Notified {
            value: receipt,
            notification,
        })
    }
}
