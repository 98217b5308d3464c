use crate::domain::{BulkResponse, CallOptions, Customer, CustomerId, FieldMap, Pagination};
use crate::error::CustomerError;
use crate::planes::data::operation::{CustomerOperations, CustomerPage, DeleteOutcome, PageSource};
use crate::ports::{CacheStore, CustomerDirectory};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use shared::TtlMs;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Single cache slot for customer listings. Any write drops it, whatever page was cached.
pub const CUSTOMER_LIST_KEY: &str = "customers";

/// Replaced on every write. A cached listing tagged with any other value is stale.
pub const CUSTOMER_LIST_GENERATION_KEY: &str = "customers:gen";

/// Tunables for the customer service
#[derive(Clone, Debug)]
pub struct ServiceSettings {
    pub cache_ttl: Duration,
    pub list_timeout: Duration,
    pub save_timeout: Duration,
    pub delete_timeout: Duration,
}

impl ServiceSettings {
    pub fn with_cache_ttl(cache_ttl: Duration) -> Self {
        Self {
            cache_ttl,
            ..Self::default()
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(600),
            list_timeout: Duration::from_secs(30),
            save_timeout: Duration::from_secs(30),
            delete_timeout: Duration::from_secs(10),
        }
    }
}

/// Cached listing, tagged with the pagination it was fetched for and the write
/// generation observed before the fetch.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedPage<P> {
    page_no: NonZeroU32,
    records_on_page: NonZeroU32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    generation: Option<String>,
    payload: P,
}

/// Read-through cache and write invalidation around the remote customer directory.
/// Holds no per-request state; both collaborators are shared across requests.
#[derive(Clone)]
pub struct CustomerOperationsService {
    cache: Arc<dyn CacheStore>,
    directory: Arc<dyn CustomerDirectory>,
    settings: ServiceSettings,
}

impl CustomerOperationsService {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        directory: Arc<dyn CustomerDirectory>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            cache,
            directory,
            settings,
        }
    }

    /// Current write generation; the inner `None` means no write has been recorded.
    /// Returns `None` when the store can't be read, and the cache is bypassed.
    async fn read_generation(&self, deadline: Instant) -> Option<Option<String>> {
        match timeout_at(deadline, self.cache.get(CUSTOMER_LIST_GENERATION_KEY)).await {
            Ok(Ok(generation)) => Some(generation),
            Ok(Err(e)) => {
                warn!(error = %e, "customer list generation lookup failed, bypassing cache");
                None
            }
            Err(_) => {
                warn!("customer list generation lookup timed out, bypassing cache");
                None
            }
        }
    }

    async fn cached_page(
        &self,
        pagination: Pagination,
        generation: &Option<String>,
        deadline: Instant,
    ) -> Option<CustomerPage> {
        let raw = match timeout_at(deadline, self.cache.get(CUSTOMER_LIST_KEY)).await {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => {
                debug!("customer list cache miss");
                return None;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "customer list cache lookup failed, falling back to directory");
                return None;
            }
            Err(_) => {
                warn!("customer list cache lookup timed out, falling back to directory");
                return None;
            }
        };

        match serde_json::from_str::<CachedPage<Box<RawValue>>>(&raw) {
            Ok(page)
                if page.page_no == pagination.page_no
                    && page.records_on_page == pagination.records_on_page
                    && page.generation == *generation =>
            {
                debug!("customer list cache hit");
                Some(CustomerPage {
                    payload: page.payload,
                    source: PageSource::Cache,
                })
            }
            Ok(page) => {
                debug!(
                    cached_page = %page.page_no,
                    cached_size = %page.records_on_page,
                    "cached customer list is stale or for another page"
                );
                None
            }
            Err(e) => {
                warn!(error = %e, "discarding undecodable customer list cache entry");
                None
            }
        }
    }

    async fn store_page(
        &self,
        pagination: Pagination,
        generation: Option<String>,
        payload: &RawValue,
        deadline: Instant,
    ) {
        let entry = CachedPage {
            page_no: pagination.page_no,
            records_on_page: pagination.records_on_page,
            generation,
            payload,
        };
        let serialized = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to serialize customer list for caching");
                return;
            }
        };

        let ttl = TtlMs(self.settings.cache_ttl.as_millis() as u64);
        match timeout_at(deadline, self.cache.put(CUSTOMER_LIST_KEY, serialized, Some(ttl))).await {
            Ok(Ok(_)) => debug!(ttl_ms = ttl.0, "cached customer list"),
            Ok(Err(e)) => warn!(error = %e, "failed to cache customer list"),
            Err(_) => warn!("caching customer list timed out"),
        }
    }

    /// Advances the write generation and drops the cached listing. Listings fetched
    /// before this point can no longer be served, even if stored afterwards.
    async fn invalidate_customer_list(&self, deadline: Instant) {
        // Outlives any page tagged with the previous generation
        let ttl = self.settings.cache_ttl + self.settings.list_timeout;
        let generation = Uuid::new_v4().to_string();
        match timeout_at(
            deadline,
            self.cache.put(
                CUSTOMER_LIST_GENERATION_KEY,
                generation,
                Some(TtlMs(ttl.as_millis() as u64)),
            ),
        )
        .await
        {
            Ok(Ok(_)) => debug!("advanced customer list generation"),
            Ok(Err(e)) => warn!(error = %e, "failed to advance customer list generation"),
            Err(_) => warn!("advancing customer list generation timed out"),
        }

        match timeout_at(deadline, self.cache.delete(&[CUSTOMER_LIST_KEY])).await {
            Ok(Ok(result)) => debug!(removed = result.deleted, "invalidated customer list cache"),
            Ok(Err(e)) => warn!(
                error = %e,
                "failed to invalidate customer list cache, stale reads possible until TTL expiry"
            ),
            Err(_) => warn!(
                "invalidating customer list cache timed out, stale reads possible until TTL expiry"
            ),
        }
    }
}

/// Runs a directory call against the request deadline.
async fn bounded<T, F>(
    operation: &'static str,
    budget: Duration,
    deadline: Instant,
    call: F,
) -> Result<T, CustomerError>
where
    F: Future<Output = Result<T, crate::error::DirectoryError>>,
{
    match timeout_at(deadline, call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(CustomerError::Timeout {
            operation,
            after: budget,
        }),
    }
}

#[async_trait]
impl CustomerOperations for CustomerOperationsService {
    async fn list_customers(&self, pagination: Pagination) -> Result<CustomerPage, CustomerError> {
        let budget = self.settings.list_timeout;
        let deadline = Instant::now() + budget;

        let generation = self.read_generation(deadline).await;
        if let Some(generation) = &generation {
            if let Some(page) = self.cached_page(pagination, generation, deadline).await {
                return Ok(page);
            }
        }

        info!(
            page_no = %pagination.page_no,
            records_on_page = %pagination.records_on_page,
            "fetching customers from directory"
        );
        let filters = [pagination.to_filter()];
        let response = bounded(
            "list customers",
            budget,
            deadline,
            self.directory
                .get_customers_bulk(&filters, &CallOptions::new()),
        )
        .await?;

        let payload = serde_json::value::to_raw_value(&response)?;
        if let Some(generation) = generation {
            self.store_page(pagination, generation, &payload, deadline).await;
        }

        Ok(CustomerPage {
            payload,
            source: PageSource::Remote,
        })
    }

    async fn save_customers(&self, customers: Vec<Customer>) -> Result<BulkResponse, CustomerError> {
        if customers.is_empty() {
            return Err(CustomerError::EmptyBatch("no customers to save"));
        }

        let budget = self.settings.save_timeout;
        let deadline = Instant::now() + budget;

        let items: Vec<FieldMap> = customers.iter().map(Customer::to_field_map).collect();
        info!(count = items.len(), "saving customers");

        let response = bounded(
            "save customers",
            budget,
            deadline,
            self.directory.save_customer_bulk(&items, &CallOptions::new()),
        )
        .await?;

        let failed = response.failed_items().count();
        if failed > 0 {
            warn!(failed, total = items.len(), "bulk save completed with item failures");
        }

        self.invalidate_customer_list(deadline).await;
        Ok(response)
    }

    async fn delete_customers(&self, ids: Vec<CustomerId>) -> Result<DeleteOutcome, CustomerError> {
        if ids.is_empty() {
            return Err(CustomerError::EmptyBatch("no customer IDs provided"));
        }

        let budget = self.settings.delete_timeout;
        let deadline = Instant::now() + budget;

        let items: Vec<FieldMap> = ids.iter().map(CustomerId::to_field_map).collect();
        for id in &ids {
            info!(customer_id = %id, "deleting customer");
        }

        let outcome = match bounded(
            "delete customers",
            budget,
            deadline,
            self.directory.delete_customer_bulk(&items, &CallOptions::new()),
        )
        .await
        {
            Ok(response) => DeleteOutcome::Deleted(response),
            Err(CustomerError::Directory(err)) if err.is_already_deleted() => {
                warn!(error = %err, "customer already deleted or invalid ID");
                DeleteOutcome::AlreadyDeleted(err.into_response().unwrap_or_default())
            }
            Err(err) => return Err(err),
        };

        self.invalidate_customer_list(deadline).await;
        Ok(outcome)
    }
}

impl std::fmt::Debug for CustomerOperationsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerOperationsService")
            .field("settings", &self.settings)
            .finish()
    }
}
