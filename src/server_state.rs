use std::sync::Arc;

use anyhow::Result;

use crate::{
    auth::{AuthProvider, IdentityToolkit},
    chat::ChatClient,
    config::Config,
    database::{firestore_pool, RescueDatabase},
    help::ClaimRegistry,
    image_host::{ImageHost, ImgHost},
    payment::{PaymentProvider, SimulatedPayment},
};

#[derive(Clone)]
pub struct ServerState {
    pub db: RescueDatabase,
    pub auth: Arc<dyn AuthProvider>,
    pub images: Arc<dyn ImageHost>,
    pub payments: Arc<dyn PaymentProvider>,
    pub chat: Option<Arc<ChatClient>>,
    pub claims: Arc<ClaimRegistry>,
}

impl ServerState {
    pub fn new(config: &Config, in_memory: bool) -> Result<Self> {
        let db = if in_memory {
            tracing::warn!("Using the in-memory store; nothing will be persisted.");
            RescueDatabase::in_memory()
        } else {
            RescueDatabase::firestore(firestore_pool()?)
        };

        Ok(ServerState {
            db,
            auth: Arc::new(IdentityToolkit::new(&config.identity_api_key)),
            images: Arc::new(ImgHost::new(&config.image_host_url, &config.image_host_key)),
            payments: Arc::new(SimulatedPayment::new(config.payment_delay)),
            chat: config
                .chat_endpoint
                .as_deref()
                .map(|endpoint| Arc::new(ChatClient::new(endpoint))),
            claims: Arc::new(ClaimRegistry::default()),
        })
    }
}
