//! In-process store with the same semantics as [`PgStore`](super::PgStore).
//!
//! Each trait method takes the lock once, so every call is atomic just like
//! the single SQL statements it stands in for. Unique constraints (email,
//! one cart line per product, one default address per user) are enforced the
//! same way the schema enforces them, and line quantities saturate at
//! `i32::MAX` like the upsert in [`super::carts`].
//!
//! [`MemoryStore::inject_cart_fault`] makes cart operations fail the way a
//! lost database connection would.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use blossom_core::{
    AddressId, CartId, CartItemId, Email, OrderId, OrderItemId, OrderStatus, PaymentMethod,
    PaymentStatus, Price, ProductId, Quantity, UserId, WishlistId,
};

use super::{
    AddressStore, CartStore, OrderStore, Persistence, ProductStore, RepositoryError, UserStore,
    WishlistStore,
};
use crate::models::address::{Address, AddressFields};
use crate::models::cart::{Cart, CartLine};
use crate::models::order::{Order, OrderLine};
use crate::models::product::{NewProduct, Product, ProductSummary};
use crate::models::user::{NewUser, User};
use crate::models::wishlist::{Wishlist, WishlistEntry};

const DEFAULT_TAKEN: &str = "another default address was set concurrently";

/// A failure to inject into cart operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartFault {
    /// Loading or creating a cart fails.
    Unavailable,
    /// `add_quantity` succeeds this many more times, then fails.
    AddQuantityAfter(usize),
}

fn injected_failure() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

struct UserRecord {
    user: User,
    password_hash: Option<String>,
    reset_token: Option<(String, DateTime<Utc>)>,
}

struct CartItemRecord {
    id: CartItemId,
    cart_id: CartId,
    product_id: ProductId,
    quantity: Quantity,
}

struct WishlistItemRecord {
    wishlist_id: WishlistId,
    product_id: ProductId,
    added_at: DateTime<Utc>,
}

struct OrderRecord {
    user_id: UserId,
    address_id: Option<AddressId>,
    order: Order,
}

#[derive(Default)]
struct Inner {
    next_id: i32,
    users: Vec<UserRecord>,
    products: Vec<Product>,
    carts: Vec<(CartId, UserId)>,
    cart_items: Vec<CartItemRecord>,
    wishlists: Vec<(WishlistId, UserId)>,
    wishlist_items: Vec<WishlistItemRecord>,
    addresses: Vec<Address>,
    orders: Vec<OrderRecord>,
    cart_fault: Option<CartFault>,
}

impl Inner {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn summary(&self, product_id: ProductId) -> Option<ProductSummary> {
        self.products
            .iter()
            .find(|p| p.id == product_id)
            .map(Product::summary)
    }

    fn email_taken(&self, email: &Email, except: Option<UserId>) -> bool {
        self.users
            .iter()
            .any(|r| &r.user.email == email && Some(r.user.id) != except)
    }

    fn has_other_default(&self, user_id: UserId, except: Option<AddressId>) -> bool {
        self.addresses
            .iter()
            .any(|a| a.user_id == user_id && a.is_default && Some(a.id) != except)
    }
}

/// Mutex-backed implementation of every store trait.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a product to the catalog.
    pub fn insert_product(&self, new: NewProduct) -> Product {
        let mut inner = self.lock();
        let product = Product {
            id: ProductId::new(inner.next_id()),
            name: new.name,
            description: new.description,
            price: new.price,
            images: new.images,
            is_new: new.is_new,
            is_bestseller: new.is_bestseller,
            is_on_sale: new.is_on_sale,
            discount_percentage: new.discount_percentage,
            created_at: Utc::now(),
        };
        inner.products.push(product.clone());
        product
    }

    /// Record a placed order, priced at current sale prices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user or a product does not exist.
    pub fn insert_order(
        &self,
        user_id: UserId,
        address_id: Option<AddressId>,
        payment_method: PaymentMethod,
        lines: &[(ProductId, Quantity)],
    ) -> Result<Order, RepositoryError> {
        let mut inner = self.lock();
        if !inner.users.iter().any(|r| r.user.id == user_id) {
            return Err(RepositoryError::NotFound);
        }

        let mut items = Vec::with_capacity(lines.len());
        for &(product_id, quantity) in lines {
            let product = inner.summary(product_id).ok_or(RepositoryError::NotFound)?;
            items.push(OrderLine {
                id: OrderItemId::new(inner.next_id()),
                quantity,
                price: product.sale_price(),
                product,
            });
        }

        let order = Order {
            id: OrderId::new(inner.next_id()),
            status: OrderStatus::default(),
            payment_status: PaymentStatus::default(),
            payment_method,
            total: items.iter().map(|l| l.price.times(l.quantity.get())).sum::<Price>(),
            created_at: Utc::now(),
            items,
            address: None,
        };
        inner.orders.push(OrderRecord {
            user_id,
            address_id,
            order: order.clone(),
        });
        Ok(order)
    }

    /// Number of users, carts and wishlists (for registration atomicity checks).
    #[must_use]
    pub fn row_counts(&self) -> (usize, usize, usize) {
        let inner = self.lock();
        (inner.users.len(), inner.carts.len(), inner.wishlists.len())
    }

    /// Make cart operations fail until cleared with `None`.
    pub fn inject_cart_fault(&self, fault: Option<CartFault>) {
        self.lock().cart_fault = fault;
    }

    /// The user's current password hash.
    #[must_use]
    pub fn password_hash_of(&self, user_id: UserId) -> Option<String> {
        self.lock()
            .users
            .iter()
            .find(|r| r.user.id == user_id)
            .and_then(|r| r.password_hash.clone())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|r| &r.user.email == email)
            .map(|r| r.user.clone()))
    }

    async fn user_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|r| &r.user.email == email)
            .and_then(|r| Some((r.user.clone(), r.password_hash.clone()?))))
    }

    async fn register_user(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let mut inner = self.lock();
        if inner.email_taken(&new_user.email, None) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(inner.next_id()),
            name: new_user.name.clone(),
            email: new_user.email.clone(),
            image: None,
            created_at: now,
            updated_at: now,
        };
        let cart_id = CartId::new(inner.next_id());
        let wishlist_id = WishlistId::new(inner.next_id());

        inner.users.push(UserRecord {
            user: user.clone(),
            password_hash: Some(new_user.password_hash.clone()),
            reset_token: None,
        });
        inner.carts.push((cart_id, user.id));
        inner.wishlists.push((wishlist_id, user.id));
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: UserId,
        name: Option<&str>,
        email: Option<&Email>,
    ) -> Result<User, RepositoryError> {
        let mut inner = self.lock();
        if let Some(email) = email
            && inner.email_taken(email, Some(id))
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let record = inner
            .users
            .iter_mut()
            .find(|r| r.user.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if let Some(name) = name {
            name.clone_into(&mut record.user.name);
        }
        if let Some(email) = email {
            record.user.email = email.clone();
        }
        record.user.updated_at = Utc::now();
        Ok(record.user.clone())
    }

    async fn store_reset_token(
        &self,
        id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        let record = inner
            .users
            .iter_mut()
            .find(|r| r.user.id == id)
            .ok_or(RepositoryError::NotFound)?;
        record.reset_token = Some((token_hash.to_owned(), expires_at));
        Ok(())
    }

    async fn reset_password(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<UserId>, RepositoryError> {
        let mut inner = self.lock();
        let record = inner.users.iter_mut().find(|r| {
            r.reset_token
                .as_ref()
                .is_some_and(|(hash, expires_at)| hash == token_hash && *expires_at > now)
        });

        Ok(record.map(|r| {
            r.reset_token = None;
            r.password_hash = Some(password_hash.to_owned());
            r.user.updated_at = now;
            r.user.id
        }))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn products(&self) -> Result<Vec<Product>, RepositoryError> {
        let mut products = self.lock().products.clone();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(products)
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.lock().products.iter().find(|p| p.id == id).cloned())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let inner = self.lock();
        if inner.cart_fault == Some(CartFault::Unavailable) {
            return Err(injected_failure());
        }
        let Some(&(cart_id, _)) = inner.carts.iter().find(|(_, owner)| *owner == user_id) else {
            return Ok(None);
        };

        let items = inner
            .cart_items
            .iter()
            .filter(|item| item.cart_id == cart_id)
            .filter_map(|item| {
                Some(CartLine {
                    id: item.id,
                    quantity: item.quantity,
                    product: inner.summary(item.product_id)?,
                })
            })
            .collect();

        Ok(Some(Cart { id: cart_id, items }))
    }

    async fn create_cart(&self, user_id: UserId) -> Result<CartId, RepositoryError> {
        let mut inner = self.lock();
        if inner.cart_fault == Some(CartFault::Unavailable) {
            return Err(injected_failure());
        }
        if let Some(&(cart_id, _)) = inner.carts.iter().find(|(_, owner)| *owner == user_id) {
            return Ok(cart_id);
        }
        let cart_id = CartId::new(inner.next_id());
        inner.carts.push((cart_id, user_id));
        Ok(cart_id)
    }

    async fn add_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Quantity, RepositoryError> {
        let mut inner = self.lock();
        match inner.cart_fault {
            Some(CartFault::AddQuantityAfter(0)) => return Err(injected_failure()),
            Some(CartFault::AddQuantityAfter(remaining)) => {
                inner.cart_fault = Some(CartFault::AddQuantityAfter(remaining - 1));
            }
            _ => {}
        }
        if let Some(item) = inner
            .cart_items
            .iter_mut()
            .find(|item| item.cart_id == cart_id && item.product_id == product_id)
        {
            item.quantity = item.quantity.saturating_add(quantity);
            return Ok(item.quantity);
        }

        let id = CartItemId::new(inner.next_id());
        inner.cart_items.push(CartItemRecord {
            id,
            cart_id,
            product_id,
            quantity,
        });
        Ok(quantity)
    }

    async fn set_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();
        match inner
            .cart_items
            .iter_mut()
            .find(|item| item.cart_id == cart_id && item.product_id == product_id)
        {
            Some(item) => {
                item.quantity = quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();
        let before = inner.cart_items.len();
        inner
            .cart_items
            .retain(|item| !(item.cart_id == cart_id && item.product_id == product_id));
        Ok(inner.cart_items.len() != before)
    }
}

#[async_trait]
impl WishlistStore for MemoryStore {
    async fn wishlist_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<Wishlist>, RepositoryError> {
        let inner = self.lock();
        let Some(&(wishlist_id, _)) = inner.wishlists.iter().find(|(_, owner)| *owner == user_id)
        else {
            return Ok(None);
        };

        let items = inner
            .wishlist_items
            .iter()
            .rev()
            .filter(|item| item.wishlist_id == wishlist_id)
            .filter_map(|item| {
                Some(WishlistEntry {
                    product: inner.summary(item.product_id)?,
                    added_at: item.added_at,
                })
            })
            .collect();

        Ok(Some(Wishlist {
            id: wishlist_id,
            items,
        }))
    }

    async fn create_wishlist(&self, user_id: UserId) -> Result<WishlistId, RepositoryError> {
        let mut inner = self.lock();
        if let Some(&(id, _)) = inner.wishlists.iter().find(|(_, owner)| *owner == user_id) {
            return Ok(id);
        }
        let id = WishlistId::new(inner.next_id());
        inner.wishlists.push((id, user_id));
        Ok(id)
    }

    async fn add_to_wishlist(
        &self,
        wishlist_id: WishlistId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        let exists = inner
            .wishlist_items
            .iter()
            .any(|item| item.wishlist_id == wishlist_id && item.product_id == product_id);
        if !exists {
            inner.wishlist_items.push(WishlistItemRecord {
                wishlist_id,
                product_id,
                added_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn remove_from_wishlist(
        &self,
        wishlist_id: WishlistId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();
        let before = inner.wishlist_items.len();
        inner
            .wishlist_items
            .retain(|item| !(item.wishlist_id == wishlist_id && item.product_id == product_id));
        Ok(inner.wishlist_items.len() != before)
    }
}

#[async_trait]
impl AddressStore for MemoryStore {
    async fn addresses_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let mut addresses: Vec<Address> = self
            .lock()
            .addresses
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        addresses.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then(b.created_at.cmp(&a.created_at))
                .then(b.id.cmp(&a.id))
        });
        Ok(addresses)
    }

    async fn address(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        Ok(self
            .lock()
            .addresses
            .iter()
            .find(|a| a.id == id && a.user_id == user_id)
            .cloned())
    }

    async fn clear_default(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut inner = self.lock();
        let now = Utc::now();
        let mut changed = 0;
        for address in inner
            .addresses
            .iter_mut()
            .filter(|a| a.user_id == user_id && a.is_default)
        {
            address.is_default = false;
            address.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }

    async fn insert_address(
        &self,
        user_id: UserId,
        fields: &AddressFields,
        is_default: bool,
    ) -> Result<Address, RepositoryError> {
        let mut inner = self.lock();
        if is_default && inner.has_other_default(user_id, None) {
            return Err(RepositoryError::Conflict(DEFAULT_TAKEN.to_owned()));
        }

        let now = Utc::now();
        let address = Address {
            id: AddressId::new(inner.next_id()),
            user_id,
            street: fields.street().to_owned(),
            city: fields.city().to_owned(),
            state: fields.state().to_owned(),
            postal_code: fields.postal_code().to_owned(),
            country: fields.country().to_owned(),
            is_default,
            created_at: now,
            updated_at: now,
        };
        inner.addresses.push(address.clone());
        Ok(address)
    }

    async fn update_address(
        &self,
        user_id: UserId,
        id: AddressId,
        fields: &AddressFields,
        is_default: bool,
    ) -> Result<Option<Address>, RepositoryError> {
        let mut inner = self.lock();
        if is_default && inner.has_other_default(user_id, Some(id)) {
            return Err(RepositoryError::Conflict(DEFAULT_TAKEN.to_owned()));
        }

        let Some(address) = inner
            .addresses
            .iter_mut()
            .find(|a| a.id == id && a.user_id == user_id)
        else {
            return Ok(None);
        };
        fields.street().clone_into(&mut address.street);
        fields.city().clone_into(&mut address.city);
        fields.state().clone_into(&mut address.state);
        fields.postal_code().clone_into(&mut address.postal_code);
        fields.country().clone_into(&mut address.country);
        address.is_default = is_default;
        address.updated_at = Utc::now();
        Ok(Some(address.clone()))
    }

    async fn mark_default(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let mut inner = self.lock();
        if inner.has_other_default(user_id, Some(id)) {
            return Err(RepositoryError::Conflict(DEFAULT_TAKEN.to_owned()));
        }

        let Some(address) = inner
            .addresses
            .iter_mut()
            .find(|a| a.id == id && a.user_id == user_id)
        else {
            return Ok(None);
        };
        address.is_default = true;
        address.updated_at = Utc::now();
        Ok(Some(address.clone()))
    }

    async fn delete_address(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();
        let before = inner.addresses.len();
        inner
            .addresses
            .retain(|a| !(a.id == id && a.user_id == user_id));
        let deleted = inner.addresses.len() != before;

        // ON DELETE SET NULL
        if deleted {
            for record in inner.orders.iter_mut().filter(|o| o.address_id == Some(id)) {
                record.address_id = None;
            }
        }
        Ok(deleted)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .lock()
            .orders
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.order.clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn order_for_user(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let inner = self.lock();
        let Some(record) = inner
            .orders
            .iter()
            .find(|r| r.order.id == id && r.user_id == user_id)
        else {
            return Ok(None);
        };

        let mut order = record.order.clone();
        order.address = record
            .address_id
            .and_then(|address_id| inner.addresses.iter().find(|a| a.id == address_id))
            .cloned();
        Ok(Some(order))
    }
}

#[async_trait]
impl Persistence for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
