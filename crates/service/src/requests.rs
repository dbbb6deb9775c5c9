//! Request service: CRUD over the request/request-item aggregate.
//!
//! Every operation that returns a request re-reads it through
//! [`RequestService::get_by_id`], so callers always receive the full
//! aggregate (employee, account email, items in insertion order).
//! Failures are logged where they are detected and then returned unchanged;
//! nothing is retried.

use tracing::{error, info, instrument};

use db::models::{NewRequest, RequestDetails, RequestFields, RequestStatus};
use db::RequestStore;

use crate::params::{to_records, CreateRequest, ItemInput, UpdateRequest};
use crate::ServiceError;

pub struct RequestService<S> {
    store: S,
}

impl<S: RequestStore> RequestService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// All requests, newest first.
    #[instrument(skip(self))]
    pub async fn get_all(&self) -> Result<Vec<RequestDetails>, ServiceError> {
        self.store
            .list_requests()
            .await
            .inspect_err(|e| error!(error = %e, "failed to list requests"))
            .map_err(ServiceError::from)
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i64) -> Result<RequestDetails, ServiceError> {
        match self.store.find_request(id).await {
            Ok(Some(request)) => Ok(request),
            Ok(None) => {
                error!(request_id = id, "request not found");
                Err(ServiceError::NotFound { id })
            }
            Err(e) => {
                error!(request_id = id, error = %e, "failed to load request");
                Err(e.into())
            }
        }
    }

    /// Insert a request and its items, then return the stored aggregate.
    #[instrument(skip(self, params), fields(employee_id = params.employee_id))]
    pub async fn create(&self, params: CreateRequest) -> Result<RequestDetails, ServiceError> {
        let request = NewRequest {
            employee_id: params.employee_id,
            fields: RequestFields {
                kind: params.kind,
                status: params.status.unwrap_or_default(),
                description: params.description,
            },
            items: to_records(&params.items),
        };

        let id = self
            .store
            .insert_request(&request)
            .await
            .inspect_err(|e| error!(error = %e, "failed to create request"))?;

        info!(request_id = id, items = request.items.len(), "request created");
        self.get_by_id(id).await
    }

    /// Apply `params` to an existing request. See [`UpdateRequest`] for how
    /// absent fields and the `items` key are treated.
    #[instrument(skip(self, params))]
    pub async fn update(&self, id: i64, params: UpdateRequest) -> Result<RequestDetails, ServiceError> {
        let current = self.get_by_id(id).await?;

        let fields = RequestFields {
            kind: params.kind.unwrap_or(current.kind),
            status: params.status.unwrap_or(current.status),
            description: params.description.unwrap_or(current.description),
        };
        let items = params.items.as_deref().map(to_records);

        let updated = self
            .store
            .update_request(id, &fields, items.as_deref())
            .await
            .inspect_err(|e| error!(request_id = id, error = %e, "failed to update request"))?;

        // Deleted between the read and the write.
        if !updated {
            error!(request_id = id, "request not found");
            return Err(ServiceError::NotFound { id });
        }

        self.get_by_id(id).await
    }

    /// Delete a request; its items are removed by the store's cascade.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.get_by_id(id).await?;

        let deleted = self
            .store
            .delete_request(id)
            .await
            .inspect_err(|e| error!(request_id = id, error = %e, "failed to delete request"))?;

        // Someone else removed it between the read and the delete.
        if !deleted {
            error!(request_id = id, "request not found");
            return Err(ServiceError::NotFound { id });
        }

        info!(request_id = id, "request deleted");
        Ok(())
    }

    /// Change only the status of a request.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: i64, status: RequestStatus) -> Result<RequestDetails, ServiceError> {
        self.get_by_id(id).await?;

        self.store
            .update_status(id, status)
            .await
            .inspect_err(|e| error!(request_id = id, error = %e, "failed to update request status"))?;

        self.get_by_id(id).await
    }

    /// Append items to a request, keeping the ones it already has.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn add_items(&self, id: i64, items: &[ItemInput]) -> Result<RequestDetails, ServiceError> {
        self.get_by_id(id).await?;

        self.store
            .append_items(id, &to_records(items))
            .await
            .inspect_err(|e| error!(request_id = id, error = %e, "failed to add request items"))?;

        self.get_by_id(id).await
    }
}
