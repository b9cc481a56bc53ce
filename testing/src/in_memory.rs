//! In-memory provider implementations.
//!
//! HashMap-backed, shared through `Arc` so clones observe the same data.
//! Used by tests and by the server when no database is configured.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use subserv_core::providers::{
    BoxFuture, ProductCatalog, StoreError, SubscriptionStore, UserDirectory,
};
use subserv_core::types::{
    NewSubscription, Product, ProductId, Subscription, SubscriptionId, User, UserId,
};

/// In-memory subscription store with optimistic concurrency.
///
/// # Example
///
/// ```
/// use subserv_testing::InMemorySubscriptionStore;
/// use subserv_testing::fixtures;
/// use subserv_core::providers::SubscriptionStore;
/// use subserv_core::types::NewSubscription;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemorySubscriptionStore::new();
/// let product = &fixtures::demo_products()[0];
/// let draft = NewSubscription::pending(product, fixtures::ALICE, chrono::Utc::now())
///     .ok_or("demo plans have valid periods")?;
///
/// let created = store.create(draft).await?;
/// let saved = store.save(created.clone()).await?;
/// assert_eq!(saved.version, created.version.next());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemorySubscriptionStore {
    records: Arc<RwLock<HashMap<SubscriptionId, Subscription>>>,
    next_id: Arc<AtomicU64>,
    saves: Arc<AtomicUsize>,
    failure: Arc<RwLock<Option<StoreError>>>,
}

impl InMemorySubscriptionStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a record in place as-is, bypassing version checks.
    ///
    /// Later [`create`](SubscriptionStore::create) calls allocate ids above
    /// every inserted id.
    pub fn insert(&self, subscription: Subscription) {
        self.next_id.fetch_max(subscription.id.value(), Ordering::SeqCst);
        self.write().insert(subscription.id, subscription);
    }

    /// Read a record without going through the trait.
    #[must_use]
    pub fn snapshot(&self, id: SubscriptionId) -> Option<Subscription> {
        self.read().get(&id).cloned()
    }

    /// Number of [`save`](SubscriptionStore::save) calls so far, successful or not.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Make every subsequent call fail with `error` until [`recover`](Self::recover).
    pub fn fail_with(&self, error: StoreError) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    /// Stop injecting failures.
    pub fn recover(&self) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn injected_failure(&self) -> Result<(), StoreError> {
        match self.failure.read().unwrap_or_else(PoisonError::into_inner).clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<SubscriptionId, Subscription>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<SubscriptionId, Subscription>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SubscriptionStore for InMemorySubscriptionStore {
    fn get(&self, id: SubscriptionId) -> BoxFuture<'_, Result<Subscription, StoreError>> {
        Box::pin(async move {
            self.injected_failure()?;
            self.read().get(&id).cloned().ok_or(StoreError::NotFound)
        })
    }

    fn create(&self, draft: NewSubscription) -> BoxFuture<'_, Result<Subscription, StoreError>> {
        Box::pin(async move {
            self.injected_failure()?;
            let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
            let subscription = draft.into_subscription(id);
            self.write().insert(id, subscription.clone());
            Ok(subscription)
        })
    }

    fn save(&self, subscription: Subscription) -> BoxFuture<'_, Result<Subscription, StoreError>> {
        Box::pin(async move {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.injected_failure()?;

            let mut records = self.write();
            let stored = records.get(&subscription.id).ok_or(StoreError::NotFound)?;
            if stored.version != subscription.version {
                return Err(StoreError::Conflict {
                    expected: subscription.version,
                    actual: stored.version,
                });
            }

            let mut saved = subscription;
            saved.version = saved.version.next();
            records.insert(saved.id, saved.clone());
            Ok(saved)
        })
    }
}

/// In-memory product catalog.
#[derive(Clone, Debug, Default)]
pub struct InMemoryProductCatalog {
    products: Arc<RwLock<BTreeMap<ProductId, Product>>>,
}

impl InMemoryProductCatalog {
    /// Create a catalog holding `products`
    #[must_use]
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products.into_iter().map(|p| (p.id, p)).collect();
        Self {
            products: Arc::new(RwLock::new(products)),
        }
    }

    /// Add or replace a product.
    pub fn upsert(&self, product: Product) {
        self.products
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product.id, product);
    }
}

impl ProductCatalog for InMemoryProductCatalog {
    fn get(&self, id: ProductId) -> BoxFuture<'_, Result<Option<Product>, StoreError>> {
        Box::pin(async move {
            Ok(self
                .products
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&id)
                .cloned())
        })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<Product>, StoreError>> {
        Box::pin(async move {
            Ok(self
                .products
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .values()
                .cloned()
                .collect())
        })
    }
}

/// In-memory user directory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryUserDirectory {
    ids: Arc<RwLock<HashSet<UserId>>>,
}

impl InMemoryUserDirectory {
    /// Create a directory knowing `ids`
    #[must_use]
    pub fn new(ids: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            ids: Arc::new(RwLock::new(ids.into_iter().collect())),
        }
    }

    /// Create a directory knowing the ids of `users`
    #[must_use]
    pub fn from_users(users: &[User]) -> Self {
        Self::new(users.iter().map(|u| u.id))
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn exists(&self, id: UserId) -> BoxFuture<'_, Result<bool, StoreError>> {
        Box::pin(async move {
            Ok(self
                .ids
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&id))
        })
    }
}
