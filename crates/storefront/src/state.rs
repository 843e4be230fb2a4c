//! Application state shared across the UI shell.

use std::sync::Arc;

use crate::api::{
    AddressService, ApiClient, ApiError, AuthService, CatalogService, OrderService, UserService,
};
use crate::cart::CartStore;
use crate::checkout::{ApiBackend, CheckoutFlow};
use crate::config::StorefrontConfig;
use crate::fault::{PromptHost, PromptSurface};
use crate::search::SuggestionBox;
use crate::session::SessionManager;
use crate::storage::StorageArea;

/// Application state shared across all views.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// shared stores and API services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    durable: StorageArea,
    session_store: StorageArea,
    prompts: PromptHost,
    catalog: CatalogService,
    addresses: AddressService,
    orders: OrderService,
    users: UserService,
    session: SessionManager,
    cart: CartStore,
    suggestions: SuggestionBox<CatalogService>,
}

impl AppState {
    /// Create the application state.
    ///
    /// `surface` is the shell's renderer for the two blocking fault
    /// prompts.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(
        config: StorefrontConfig,
        surface: Arc<dyn PromptSurface>,
    ) -> Result<Self, ApiError> {
        let durable = StorageArea::open(&config.durable_store_path());
        let session_store = StorageArea::open(&config.session_store_path());
        let prompts = PromptHost::new(surface);

        let api = ApiClient::new(&config, durable.clone(), prompts.clone())?;
        let catalog = CatalogService::new(api.clone());
        let addresses = AddressService::new(api.clone());
        let orders = OrderService::new(api.clone());
        let users = UserService::new(api.clone());
        let session = SessionManager::new(AuthService::new(api), durable.clone());
        let cart = CartStore::new(durable.clone());
        let suggestions = SuggestionBox::new(catalog.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                durable,
                session_store,
                prompts,
                catalog,
                addresses,
                orders,
                users,
                session,
                cart,
                suggestions,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the fault prompt host.
    #[must_use]
    pub fn prompts(&self) -> &PromptHost {
        &self.inner.prompts
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get a reference to the address service.
    #[must_use]
    pub fn addresses(&self) -> &AddressService {
        &self.inner.addresses
    }

    /// Get a reference to the order service.
    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    /// Get a reference to the admin user service.
    #[must_use]
    pub fn users(&self) -> &UserService {
        &self.inner.users
    }

    /// Get a reference to the session manager.
    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Get a reference to the suggestion box.
    #[must_use]
    pub fn suggestions(&self) -> &SuggestionBox<CatalogService> {
        &self.inner.suggestions
    }

    /// Get a reference to the durable storage area.
    #[must_use]
    pub fn storage(&self) -> &StorageArea {
        &self.inner.durable
    }

    /// Start a checkout flow over the production backend.
    ///
    /// One flow per checkout attempt; call
    /// [`CheckoutFlow::begin`](crate::checkout::CheckoutFlow::begin) on
    /// the returned value.
    #[must_use]
    pub fn checkout(&self) -> CheckoutFlow<ApiBackend> {
        let backend = ApiBackend::new(
            self.inner.catalog.clone(),
            self.inner.addresses.clone(),
            self.inner.orders.clone(),
        );

        CheckoutFlow::new(
            backend,
            self.inner.session.clone(),
            self.inner.cart.clone(),
            self.inner.session_store.clone(),
        )
    }
}
