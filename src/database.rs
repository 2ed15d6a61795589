use std::{convert::Infallible, marker::PhantomData, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use deadpool::managed;
use futures::StreamExt;
use google_authz::{Credentials, TokenSource};
use tiny_firestore_odm::{Collection, Database, NamedDocument};
use tokio::sync::RwLock;

use crate::{
    model::{
        Document, Donation, HelpRecord, Profile, Report, Role, Subscriber, DONATIONS_COLLECTION,
        HELP_COLLECTION, REPORTS_COLLECTION, SUBSCRIBERS_COLLECTION,
    },
};

/// Collection-scoped access to documents. No transactions, no server-side joins.
#[async_trait]
pub trait DocumentCollection<T: Document>: Send + Sync {
    /// Every document, in store order.
    async fn list(&self) -> Result<Vec<T>>;

    /// Create the document under its own id. Returns false if the id is taken.
    async fn insert(&self, doc: &T) -> Result<bool>;

    /// Create or overwrite the document under its own id.
    async fn put(&self, doc: &T) -> Result<()>;

    async fn remove(&self, id: &str) -> Result<()>;

    /// The document stored under `id`, if any.
    async fn find(&self, id: &str) -> Result<Option<T>>;
}

pub struct FirestoreManager {
    project_id: String,
}

#[async_trait]
impl managed::Manager for FirestoreManager {
    type Type = Database;
    type Error = Infallible;

    async fn create(&self) -> Result<Database, Infallible> {
        let token_source: TokenSource = Credentials::default().await.into();

        Ok(Database::new(token_source, &self.project_id).await)
    }

    async fn recycle(&self, _: &mut Database) -> managed::RecycleResult<Infallible> {
        Ok(())
    }
}

pub type FirestorePool = managed::Pool<FirestoreManager>;

pub fn firestore_pool() -> Result<FirestorePool> {
    let project_id = std::env::var("GCP_PROJECT_ID").context("Expected GCP_PROJECT_ID env var.")?;

    Ok(managed::Pool::<FirestoreManager>::builder(FirestoreManager { project_id }).build()?)
}

pub struct FirestoreCollection<T> {
    pool: FirestorePool,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> FirestoreCollection<T> {
    pub fn new(pool: FirestorePool, name: &'static str) -> Self {
        FirestoreCollection {
            pool,
            name,
            _marker: PhantomData,
        }
    }

    async fn collection(&self) -> Result<Collection<T::Record>> {
        let db = self.pool.get().await?;

        Ok(db.collection(self.name))
    }
}

fn is_not_found(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<tonic::Status>()
        .map_or(false, |status| status.code() == tonic::Code::NotFound)
}

#[async_trait]
impl<T: Document> DocumentCollection<T> for FirestoreCollection<T> {
    async fn list(&self) -> Result<Vec<T>> {
        let collection = self.collection().await?;

        // The list stream panics on RPC or decode failures; keep that inside its own task.
        let docs = tokio::spawn(async move {
            collection
                .list()
                .collect::<Vec<NamedDocument<T::Record>>>()
                .await
        })
        .await
        .with_context(|| format!("Listing {} failed.", self.name))?;
        tracing::debug!(collection = self.name, count = docs.len(), "Listed documents.");

        Ok(docs.into_iter().map(|doc| doc.value.into()).collect())
    }

    async fn find(&self, id: &str) -> Result<Option<T>> {
        match self.collection().await?.get(id).await {
            Ok(record) => Ok(Some(record.into())),
            Err(error) if is_not_found(&error) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn insert(&self, doc: &T) -> Result<bool> {
        let record = T::Record::from(doc);
        let created = self.collection().await?.try_create(&record, doc.id()).await?;
        tracing::info!(collection = self.name, id = doc.id(), %created, "Inserted document.");

        Ok(created)
    }

    async fn put(&self, doc: &T) -> Result<()> {
        let record = T::Record::from(doc);
        self.collection().await?.upsert(&record, doc.id()).await?;
        tracing::info!(collection = self.name, id = doc.id(), "Wrote document.");

        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.collection().await?.delete(id).await?;
        tracing::info!(collection = self.name, %id, "Deleted document.");

        Ok(())
    }
}

/// Process-local store, used for `serve --in-memory` and in tests.
pub struct MemoryCollection<T> {
    docs: RwLock<Vec<T>>,
}

impl<T> Default for MemoryCollection<T> {
    fn default() -> Self {
        MemoryCollection {
            docs: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl<T: Document> DocumentCollection<T> for MemoryCollection<T> {
    async fn list(&self) -> Result<Vec<T>> {
        Ok(self.docs.read().await.clone())
    }

    async fn find(&self, id: &str) -> Result<Option<T>> {
        Ok(self.docs.read().await.iter().find(|doc| doc.id() == id).cloned())
    }

    async fn insert(&self, doc: &T) -> Result<bool> {
        let mut docs = self.docs.write().await;
        if docs.iter().any(|existing| existing.id() == doc.id()) {
            return Ok(false);
        }
        docs.push(doc.clone());

        Ok(true)
    }

    async fn put(&self, doc: &T) -> Result<()> {
        let mut docs = self.docs.write().await;
        match docs.iter_mut().find(|existing| existing.id() == doc.id()) {
            Some(existing) => *existing = doc.clone(),
            None => docs.push(doc.clone()),
        }

        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.docs.write().await.retain(|doc| doc.id() != id);

        Ok(())
    }
}

/// The app's collections, each behind its own store handle.
#[derive(Clone)]
pub struct RescueDatabase {
    users: Arc<dyn DocumentCollection<Profile>>,
    ngos: Arc<dyn DocumentCollection<Profile>>,
    admins: Arc<dyn DocumentCollection<Profile>>,
    reports: Arc<dyn DocumentCollection<Report>>,
    help: Arc<dyn DocumentCollection<HelpRecord>>,
    donations: Arc<dyn DocumentCollection<Donation>>,
    subscribers: Arc<dyn DocumentCollection<Subscriber>>,
}

impl RescueDatabase {
    pub fn firestore(pool: FirestorePool) -> Self {
        RescueDatabase {
            users: Arc::new(FirestoreCollection::<Profile>::new(pool.clone(), Role::User.collection())),
            ngos: Arc::new(FirestoreCollection::<Profile>::new(pool.clone(), Role::Ngo.collection())),
            admins: Arc::new(FirestoreCollection::<Profile>::new(pool.clone(), Role::Admin.collection())),
            reports: Arc::new(FirestoreCollection::<Report>::new(pool.clone(), REPORTS_COLLECTION)),
            help: Arc::new(FirestoreCollection::<HelpRecord>::new(pool.clone(), HELP_COLLECTION)),
            donations: Arc::new(FirestoreCollection::<Donation>::new(pool.clone(), DONATIONS_COLLECTION)),
            subscribers: Arc::new(FirestoreCollection::<Subscriber>::new(pool, SUBSCRIBERS_COLLECTION)),
        }
    }

    pub fn in_memory() -> Self {
        RescueDatabase {
            users: Arc::new(MemoryCollection::<Profile>::default()),
            ngos: Arc::new(MemoryCollection::<Profile>::default()),
            admins: Arc::new(MemoryCollection::<Profile>::default()),
            reports: Arc::new(MemoryCollection::<Report>::default()),
            help: Arc::new(MemoryCollection::<HelpRecord>::default()),
            donations: Arc::new(MemoryCollection::<Donation>::default()),
            subscribers: Arc::new(MemoryCollection::<Subscriber>::default()),
        }
    }

    pub fn profiles(&self, role: Role) -> &dyn DocumentCollection<Profile> {
        match role {
            Role::User => self.users.as_ref(),
            Role::Ngo => self.ngos.as_ref(),
            Role::Admin => self.admins.as_ref(),
        }
    }

    pub fn reports(&self) -> &dyn DocumentCollection<Report> {
        self.reports.as_ref()
    }

    pub fn help(&self) -> &dyn DocumentCollection<HelpRecord> {
        self.help.as_ref()
    }

    pub fn donations(&self) -> &dyn DocumentCollection<Donation> {
        self.donations.as_ref()
    }

    pub fn subscribers(&self) -> &dyn DocumentCollection<Subscriber> {
        self.subscribers.as_ref()
    }
}
