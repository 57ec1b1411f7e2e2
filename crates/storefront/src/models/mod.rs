//! Domain models for the storefront.
//!
//! These types represent validated domain objects separate from database row
//! types. Row structs live next to their queries in [`crate::db`].

pub mod address;
pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod user;
pub mod wishlist;

pub use address::{Address, AddressFields, AddressFieldsError};
pub use cart::{AnonymousCart, AnonymousCartLine, Cart, CartLine};
pub use order::{Order, OrderLine};
pub use product::{NewProduct, Product, ProductSummary};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, User};
pub use wishlist::{Wishlist, WishlistEntry};
