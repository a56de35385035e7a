//! Shared state for one CLI invocation.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tz_materials_client::checkout::CheckoutController;
use tz_materials_client::{
    CartStore, ClientConfig, FileStorage, MarketplaceClient, SessionStore, Storage, TokenManager,
};
use tz_materials_core::{ProductId, Seller};

/// Failures the CLI detects before reaching the backend.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Not logged in. Run `tzm auth login` first.")]
    NotLoggedIn,

    #[error("No phone/password given. Pass --phone and --password or set TZM_PHONE and TZM_PASSWORD.")]
    MissingCredentials,

    #[error("Product {0} is not in the cart")]
    NotInCart(ProductId),

    #[error("Only {available} unit(s) of {product} in stock")]
    InsufficientStock { product: String, available: u32 },

    #[error("This account has no seller profile. Run `tzm seller create` first.")]
    NoSellerProfile,
}

/// Configuration, API client, token manager and storage for a command.
pub struct Context {
    pub config: ClientConfig,
    pub client: MarketplaceClient,
    pub auth: TokenManager<MarketplaceClient>,
    storage: Arc<dyn Storage>,
}

impl Context {
    /// Load configuration and resume the persisted session, refreshing its
    /// access token when it is about to expire.
    pub async fn init() -> Result<Self, Box<dyn std::error::Error>> {
        let config = ClientConfig::from_env()?;
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(config.state_dir.clone()));
        let client = MarketplaceClient::new(&config)?;
        let session = SessionStore::load(Arc::clone(&storage));
        let auth = TokenManager::new(client.clone(), session, config.refresh_lead);

        if auth.resume().await {
            tracing::debug!(state_dir = %config.state_dir.display(), "Resumed session");
        }

        Ok(Self {
            config,
            client,
            auth,
            storage,
        })
    }

    /// The current access token.
    pub fn access_token(&self) -> Result<String, CliError> {
        self.auth
            .session()
            .access_token()
            .ok_or(CliError::NotLoggedIn)
    }

    pub fn cart(&self) -> CartStore {
        CartStore::load(Arc::clone(&self.storage))
    }

    pub fn checkout(&self) -> CheckoutController<MarketplaceClient> {
        CheckoutController::new(
            self.client.clone(),
            self.auth.session().clone(),
            self.config.checkout.clone(),
        )
    }

    /// The caller's seller profile.
    pub async fn own_seller(&self) -> Result<Seller, Box<dyn std::error::Error>> {
        let access = self.access_token()?;
        let sellers = self.client.list_sellers(&access).await?;
        Ok(sellers
            .into_iter()
            .next()
            .ok_or(CliError::NoSellerProfile)?)
    }
}

/// A token cancelled on Ctrl-C, for aborting a running checkout.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping after the current step");
            trigger.cancel();
        }
    });
    cancel
}
