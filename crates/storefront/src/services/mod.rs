//! Business logic services for the storefront.
//!
//! # Services
//!
//! - [`cart`] - Cart mutations and contents with inventory checks
//! - [`checkout`] - Hosted checkout sessions at the payment provider
//! - [`orders`] - Order history read from the payment provider
//! - [`catalog`] - Product listing, admin product management, provider sync
//! - [`accounts`] - User listing and role changes for admins
//! - [`profile`] - The signed-in user's account overview
//! - [`auth`] - Password registration and login
//!
//! Services hold `Arc` handles to the stores and the provider, so they
//! are cheap to build per request from `AppState`. Every operation takes
//! the caller explicitly; nothing is read from ambient request state.

pub mod accounts;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
mod error;
pub mod orders;
pub mod profile;

pub use accounts::AccountService;
pub use auth::{AuthError, AuthService};
pub use cart::{CartContents, CartContext, CartService};
pub use catalog::{CatalogService, ProductDetail, ProductInput, SyncReport};
pub use checkout::{CheckoutRedirect, CheckoutService};
pub use error::{ActionResult, ShopError};
pub use orders::OrderService;
pub use profile::{AccountOverview, ProfileService};
