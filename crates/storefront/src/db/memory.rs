//! In-memory store for tests and local runs without `PostgreSQL`.
//!
//! Mirrors the constraints of the SQL schema: unique emails, SKUs and
//! category slugs, one cart per user, one item per (cart, product), and
//! stock-guarded item writes.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use emporium_core::{
    CartId, CartItemId, CategoryId, Email, OrderId, OrderStatus, ProductId, ReviewId, Role,
    UserId,
};

use super::{CartStore, CatalogStore, OrderStore, RepositoryError, UserStore};
use crate::models::{
    Cart, CartItem, CartLine, Category, NewOrder, NewOrderItem, NewProduct, NewReview, NewUser,
    Order, OrderDetail, OrderLine, OrderTotals, Page, Product, ProductFilter, Review, User,
    UserFilter, UserSummary,
};

/// Same wording as the `PostgreSQL` store, which fails on `INTEGER` overflow.
const QUANTITY_OUT_OF_RANGE: &str = "cart item quantity out of range";

/// Thread-safe in-memory implementation of every store trait.
///
/// Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    next_id: i32,
    users: BTreeMap<UserId, (User, String)>,
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    product_categories: Vec<(ProductId, CategoryId)>,
    reviews: Vec<Review>,
    carts: BTreeMap<CartId, Cart>,
    items: BTreeMap<CartItemId, CartItem>,
    orders: Vec<Order>,
    order_items: Vec<(OrderId, NewOrderItem)>,
}

impl MemoryState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn item_mut(&mut self, cart_id: CartId, product_id: ProductId) -> Option<&mut CartItem> {
        self.items
            .values_mut()
            .find(|item| item.cart_id == cart_id && item.product_id == product_id)
    }

    fn touch_cart(&mut self, cart_id: CartId) {
        if let Some(cart) = self.carts.get_mut(&cart_id) {
            cart.updated_at = Utc::now();
        }
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn paginate<T>(mut all: Vec<T>, page: u32, per_page: u32) -> Page<T> {
    let page = page.max(1);
    let total = all.len() as u64;
    let offset = usize::try_from(Page::<T>::offset(page, per_page)).unwrap_or(usize::MAX);
    let items = if offset >= all.len() {
        Vec::new()
    } else {
        all.drain(offset..)
            .take(per_page as usize)
            .collect()
    };
    Page {
        items,
        page,
        per_page,
        total,
    }
}

// =============================================================================
// Carts
// =============================================================================

#[async_trait]
impl CartStore for MemoryStore {
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(cart) = state.carts.values().find(|c| c.user_id == user_id) {
            return Ok(cart.clone());
        }

        let now = Utc::now();
        let cart = Cart {
            id: CartId::new(state.next_id()),
            user_id,
            checkout_session_id: None,
            created_at: now,
            updated_at: now,
        };
        state.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn find_cart_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.carts.values().find(|c| c.user_id == user_id).cloned())
    }

    async fn find_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .items
            .values()
            .find(|item| item.cart_id == cart_id && item.product_id == product_id)
            .copied())
    }

    async fn add_item_guarded(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let mut state = self.state.write().await;
        let in_stock = state
            .products
            .get(&product_id)
            .is_some_and(|p| p.has_stock_for(quantity));
        if !in_stock {
            return Ok(None);
        }

        let item = if let Some(item) = state.item_mut(cart_id, product_id) {
            item.quantity = item
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| RepositoryError::Conflict(QUANTITY_OUT_OF_RANGE.to_string()))?;
            *item
        } else {
            let item = CartItem {
                id: CartItemId::new(state.next_id()),
                cart_id,
                product_id,
                quantity,
            };
            state.items.insert(item.id, item);
            item
        };
        state.touch_cart(cart_id);
        Ok(Some(item))
    }

    async fn set_item_quantity_guarded(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let mut state = self.state.write().await;
        let in_stock = state
            .products
            .get(&product_id)
            .is_some_and(|p| p.has_stock_for(quantity));
        if !in_stock {
            return Ok(None);
        }

        let Some(item) = state.item_mut(cart_id, product_id) else {
            return Ok(None);
        };
        item.quantity = quantity;
        let item = *item;
        state.touch_cart(cart_id);
        Ok(Some(item))
    }

    async fn delete_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        let before = state.items.len();
        state
            .items
            .retain(|_, item| !(item.cart_id == cart_id && item.product_id == product_id));
        Ok(state.items.len() < before)
    }

    async fn clear_items(&self, cart_id: CartId) -> Result<u64, RepositoryError> {
        let mut state = self.state.write().await;
        let before = state.items.len();
        state.items.retain(|_, item| item.cart_id != cart_id);
        Ok((before - state.items.len()) as u64)
    }

    async fn load_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .items
            .values()
            .filter(|item| item.cart_id == cart_id)
            .filter_map(|item| {
                state.products.get(&item.product_id).map(|product| CartLine {
                    item: *item,
                    product: product.clone(),
                })
            })
            .collect())
    }

    async fn set_checkout_session(
        &self,
        cart_id: CartId,
        session_id: &str,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let cart = state
            .carts
            .get_mut(&cart_id)
            .ok_or(RepositoryError::NotFound)?;
        cart.checkout_session_id = Some(session_id.to_owned());
        cart.updated_at = Utc::now();
        Ok(())
    }
}

// =============================================================================
// Catalog
// =============================================================================

fn newest_first(products: &mut [Product]) {
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.products.get(&id).cloned())
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        per_page: u32,
    ) -> Result<Page<Product>, RepositoryError> {
        let state = self.state.read().await;
        let category = filter.category.as_deref().and_then(|slug| {
            state
                .categories
                .values()
                .find(|c| c.slug == slug)
                .map(|c| c.id)
        });

        let mut matching: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.is_active)
            .filter(|p| {
                filter.search.as_deref().is_none_or(|term| {
                    contains_ci(&p.name, term) || contains_ci(&p.description, term)
                })
            })
            .filter(|p| match (&filter.category, category) {
                (None, _) => true,
                (Some(_), None) => false,
                (Some(_), Some(category_id)) => state
                    .product_categories
                    .iter()
                    .any(|&(pid, cid)| pid == p.id && cid == category_id),
            })
            .cloned()
            .collect();
        newest_first(&mut matching);

        Ok(paginate(matching, filter.page, per_page))
    }

    async fn list_all_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        newest_first(&mut products);
        Ok(products)
    }

    async fn unmapped_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .filter(|p| p.polar_product_id.is_none())
            .cloned()
            .collect())
    }

    async fn existing_skus(&self) -> Result<Vec<String>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.products.values().map(|p| p.sku.clone()).collect())
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut state = self.state.write().await;
        if state.products.values().any(|p| p.sku == product.sku) {
            return Err(RepositoryError::Conflict("sku already exists".to_owned()));
        }

        let now = Utc::now();
        let created = Product {
            id: ProductId::new(state.next_id()),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            sku: product.sku.clone(),
            inventory: product.inventory,
            is_active: true,
            images: product.images.clone(),
            polar_product_id: None,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(created.id, created.clone());
        for &category_id in &product.category_ids {
            if !state.product_categories.contains(&(created.id, category_id)) {
                state.product_categories.push((created.id, category_id));
            }
        }
        Ok(created)
    }

    async fn set_provider_id(
        &self,
        id: ProductId,
        provider_id: &str,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let product = state.products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        product.polar_product_id = Some(provider_id.to_owned());
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn set_inventory(
        &self,
        id: ProductId,
        inventory: i32,
    ) -> Result<Product, RepositoryError> {
        let mut state = self.state.write().await;
        let product = state.products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        product.inventory = inventory;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let state = self.state.read().await;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn product_categories(&self, id: ProductId) -> Result<Vec<Category>, RepositoryError> {
        let state = self.state.read().await;
        let mut categories: Vec<Category> = state
            .product_categories
            .iter()
            .filter(|&&(pid, _)| pid == id)
            .filter_map(|(_, cid)| state.categories.get(cid).cloned())
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn upsert_category(
        &self,
        name: &str,
        slug: &str,
        description: Option<&str>,
    ) -> Result<Category, RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.categories.values_mut().find(|c| c.slug == slug) {
            existing.name = name.to_owned();
            existing.description = description.map(str::to_owned);
            return Ok(existing.clone());
        }

        let category = Category {
            id: CategoryId::new(state.next_id()),
            name: name.to_owned(),
            slug: slug.to_owned(),
            description: description.map(str::to_owned),
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn list_reviews(&self, product_id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        let state = self.state.read().await;
        let mut reviews: Vec<Review> = state
            .reviews
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(reviews)
    }

    async fn create_review(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        let mut state = self.state.write().await;
        let author = state
            .users
            .get(&review.user_id)
            .map(|(user, _)| {
                if user.name.is_empty() {
                    user.email.local_part().to_owned()
                } else {
                    user.name.clone()
                }
            })
            .ok_or(RepositoryError::NotFound)?;
        if !state.products.contains_key(&review.product_id) {
            return Err(RepositoryError::NotFound);
        }

        let created = Review {
            id: ReviewId::new(state.next_id()),
            product_id: review.product_id,
            user_id: review.user_id,
            author,
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: Utc::now(),
        };
        state.reviews.push(created.clone());
        Ok(created)
    }

    async fn count_reviews_by_user(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let state = self.state.read().await;
        let count = state.reviews.iter().filter(|r| r.user_id == user_id).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|(user, _)| user.clone()))
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|(user, _)| &user.email == email)
            .map(|(user, _)| user.clone()))
    }

    async fn create_with_password(
        &self,
        user: &NewUser,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|(u, _)| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let created = User {
            id: UserId::new(state.next_id()),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        state
            .users
            .insert(created.id, (created.clone(), password_hash.to_owned()));
        Ok(created)
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|(user, _)| &user.email == email)
            .cloned())
    }

    async fn list_users(
        &self,
        filter: &UserFilter,
        per_page: u32,
    ) -> Result<Page<UserSummary>, RepositoryError> {
        let state = self.state.read().await;
        let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let mut matching: Vec<UserSummary> = state
            .users
            .values()
            .map(|(user, _)| user)
            .filter(|user| {
                search.is_none_or(|term| {
                    contains_ci(&user.name, term) || contains_ci(user.email.as_str(), term)
                })
            })
            .filter(|user| filter.role.is_none_or(|role| user.role == role))
            .map(|user| UserSummary {
                user: user.clone(),
                order_count: i64::try_from(
                    state.orders.iter().filter(|o| o.user_id == user.id).count(),
                )
                .unwrap_or(i64::MAX),
            })
            .collect();
        matching.sort_by(|a, b| {
            b.user
                .created_at
                .cmp(&a.user.created_at)
                .then(b.user.id.cmp(&a.user.id))
        });

        Ok(paginate(matching, filter.page, per_page))
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        let (user, _) = state.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.role = role;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

// =============================================================================
// Orders
// =============================================================================

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&order.user_id)
            || order
                .items
                .iter()
                .any(|item| !state.products.contains_key(&item.product_id))
        {
            return Err(RepositoryError::NotFound);
        }

        let created = Order {
            id: OrderId::new(state.next_id()),
            user_id: order.user_id,
            status: order.status,
            total: order.total(),
            created_at: Utc::now(),
        };
        state.orders.push(created.clone());
        state
            .order_items
            .extend(order.items.iter().map(|item| (created.id, item.clone())));
        Ok(created)
    }

    async fn recent_orders(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<OrderDetail>, RepositoryError> {
        let state = self.state.read().await;
        let mut orders: Vec<&Order> = state
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        orders
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|order| {
                let lines = state
                    .order_items
                    .iter()
                    .filter(|(id, _)| *id == order.id)
                    .map(|(_, item)| {
                        let product = state
                            .products
                            .get(&item.product_id)
                            .ok_or_else(|| {
                                RepositoryError::DataCorruption(format!(
                                    "order {} references missing product {}",
                                    order.id, item.product_id
                                ))
                            })?;
                        Ok(OrderLine {
                            product_id: item.product_id,
                            product_name: product.name.clone(),
                            quantity: item.quantity,
                            price: item.price,
                        })
                    })
                    .collect::<Result<Vec<_>, RepositoryError>>()?;
                Ok(OrderDetail {
                    order: order.clone(),
                    lines,
                })
            })
            .collect()
    }

    async fn order_totals(&self, user_id: UserId) -> Result<OrderTotals, RepositoryError> {
        let state = self.state.read().await;
        let mine = state.orders.iter().filter(|o| o.user_id == user_id);
        let mut totals = OrderTotals::default();
        for order in mine {
            totals.order_count += 1;
            if order.status != OrderStatus::Cancelled {
                totals.total_spend += order.total;
            }
        }
        Ok(totals)
    }
}
