//! Submission and per-item review of device requests.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use geotrack_core::config::CredentialConfig;
use geotrack_core::error::{AppError, ErrorKind};
use geotrack_core::events::RequestEvent;
use geotrack_core::result::AppResult;
use geotrack_core::types::pagination::{PageRequest, PageResponse};
use geotrack_database::{
    DeviceStore, LineItemApproval, LineItemRejection, RequestFilter, RequestStore,
};
use geotrack_entity::device::{Device, DeviceCode, QrPayload};
use geotrack_entity::request::{
    DeviceRequest, NewDeviceRequest, NewLineItem, RequestPriority, RequestStatus,
};

use crate::context::RequestContext;
use crate::credential::resolve_validity_days;
use crate::notification::EventDispatcher;

/// Input for submitting a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Requested devices.
    pub items: Vec<NewLineItem>,
    /// Review priority; `normal` when absent.
    pub priority: Option<RequestPriority>,
    /// Requesting department.
    pub department: Option<String>,
}

/// Result of approving a line item.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutcome {
    /// The request after the decision.
    pub request: DeviceRequest,
    /// The provisioned device.
    pub device: Device,
    /// Decoded QR payload issued with the device. Serialized with the
    /// payload's own camelCase keys.
    pub qr_payload: QrPayload,
}

/// Owns the multi-item request workflow.
#[derive(Clone)]
pub struct RequestService {
    /// Request persistence.
    requests: Arc<dyn RequestStore>,
    /// Device directory, consulted for id allocation.
    devices: Arc<dyn DeviceStore>,
    /// Post-commit notifications.
    dispatcher: EventDispatcher,
    /// Credential validity and allocation settings.
    config: CredentialConfig,
}

impl std::fmt::Debug for RequestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestService").finish_non_exhaustive()
    }
}

impl RequestService {
    /// Creates a new request service.
    pub fn new(
        requests: Arc<dyn RequestStore>,
        devices: Arc<dyn DeviceStore>,
        dispatcher: EventDispatcher,
        config: CredentialConfig,
    ) -> Self {
        Self {
            requests,
            devices,
            dispatcher,
            config,
        }
    }

    /// Submit a request with every item pending.
    pub async fn submit_request(
        &self,
        ctx: &RequestContext,
        req: SubmitRequest,
    ) -> AppResult<DeviceRequest> {
        let department = req
            .department
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        let request = DeviceRequest::submit(
            NewDeviceRequest {
                requester_id: ctx.user_id,
                priority: req.priority.unwrap_or_default(),
                department,
                items: req.items,
            },
            Utc::now(),
        )?;
        let request = self.requests.create(&request).await?;

        info!(
            user_id = %ctx.user_id,
            request_id = %request.id,
            items = request.items.len(),
            priority = %request.priority,
            "Device request submitted"
        );

        self.dispatcher
            .dispatch(
                ctx.user_id,
                RequestEvent::Submitted {
                    request_id: request.id,
                    requester_id: request.requester_id,
                    item_count: request.items.len(),
                },
            )
            .await;

        Ok(request)
    }

    /// Get a request visible to the actor.
    pub async fn get_request(&self, ctx: &RequestContext, id: Uuid) -> AppResult<DeviceRequest> {
        let request = self.load(id).await?;
        if request.requester_id != ctx.user_id && !ctx.is_elevated() {
            return Err(AppError::authorization(format!(
                "Not allowed to view request {id}"
            )));
        }
        Ok(request)
    }

    /// List requests. Regular users only ever see their own.
    pub async fn list_requests(
        &self,
        ctx: &RequestContext,
        status: Option<RequestStatus>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<DeviceRequest>> {
        let filter = RequestFilter {
            requester_id: (!ctx.is_elevated()).then_some(ctx.user_id),
            status,
        };
        debug!(user_id = %ctx.user_id, ?filter, page = page.page, "Listing requests");
        self.requests.list(&filter, page).await
    }

    /// Approve one line item, provisioning its device and credential.
    ///
    /// A fresh device id is drawn for every attempt. An id taken between
    /// the existence check and the insert surfaces as `Conflict` from the
    /// store and triggers another attempt.
    pub async fn approve_line_item(
        &self,
        ctx: &RequestContext,
        request_id: Uuid,
        index: usize,
        validity_days: Option<u32>,
    ) -> AppResult<ApprovalOutcome> {
        ctx.require_elevated("approve device requests")?;
        let validity_days = resolve_validity_days(&self.config, validity_days)?;

        // Surface NotFound / AlreadyProcessed before drawing any ids.
        self.load(request_id).await?.pending_item(index)?;

        let attempts = self.config.allocation_attempts.max(1);
        for attempt in 1..=attempts {
            let device_id = DeviceCode::generate();
            if self.devices.code_exists(&device_id).await? {
                debug!(%device_id, attempt, "Generated device id already taken");
                continue;
            }

            let approval = LineItemApproval {
                request_id,
                index,
                approver_id: ctx.user_id,
                device_id: device_id.clone(),
                validity_days,
                now: Utc::now(),
            };
            match self.requests.approve_line_item(&approval).await {
                Ok((request, device)) => {
                    let qr_payload = QrPayload::decode(&device.qr_payload)?;
                    info!(
                        user_id = %ctx.user_id,
                        request_id = %request_id,
                        item_index = index,
                        device_id = %device.device_id,
                        owner_id = %device.owner_id,
                        status = %request.status,
                        "Line item approved, device provisioned"
                    );
                    self.dispatcher
                        .dispatch(
                            ctx.user_id,
                            RequestEvent::LineItemApproved {
                                request_id,
                                item_index: index,
                                device_id: device.device_id.to_string(),
                                owner_id: device.owner_id,
                            },
                        )
                        .await;
                    return Ok(ApprovalOutcome {
                        request,
                        device,
                        qr_payload,
                    });
                }
                Err(e) if e.is(ErrorKind::Conflict) => {
                    warn!(%device_id, attempt, "Device id collision on insert, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::conflict(format!(
            "Could not allocate a unique device id after {attempts} attempts"
        )))
    }

    /// Reject one line item with a reason.
    pub async fn reject_line_item(
        &self,
        ctx: &RequestContext,
        request_id: Uuid,
        index: usize,
        reason: &str,
    ) -> AppResult<DeviceRequest> {
        ctx.require_elevated("reject device requests")?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("A rejection reason is required"));
        }

        let request = self
            .requests
            .reject_line_item(&LineItemRejection {
                request_id,
                index,
                reviewer_id: ctx.user_id,
                reason: reason.to_string(),
                now: Utc::now(),
            })
            .await?;

        info!(
            user_id = %ctx.user_id,
            request_id = %request_id,
            item_index = index,
            status = %request.status,
            "Line item rejected"
        );

        self.dispatcher
            .dispatch(
                ctx.user_id,
                RequestEvent::LineItemRejected {
                    request_id,
                    item_index: index,
                    requester_id: request.requester_id,
                    reason: reason.to_string(),
                },
            )
            .await;

        Ok(request)
    }

    async fn load(&self, id: Uuid) -> AppResult<DeviceRequest> {
        self.requests
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Request {id} not found")))
    }
}
