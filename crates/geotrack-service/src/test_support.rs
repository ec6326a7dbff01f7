//! Shared fixtures for service tests.

use std::sync::Arc;

use geotrack_core::config::{CredentialConfig, TrackingConfig};
use geotrack_database::MemoryStore;
use geotrack_entity::device::Device;
use geotrack_entity::request::NewLineItem;
use geotrack_entity::user::UserRole;
use uuid::Uuid;

use crate::request::SubmitRequest;
use crate::{
    CredentialService, DeviceService, EventDispatcher, HistoryService, IngestionService,
    RequestContext, RequestService,
};

pub(crate) struct Services {
    pub requests: RequestService,
    pub devices: DeviceService,
    pub credentials: CredentialService,
    pub ingestion: IngestionService,
    pub history: HistoryService,
}

pub(crate) fn service_with_store(store: &MemoryStore) -> Services {
    let shared = Arc::new(store.clone());
    let tracking = TrackingConfig::default();
    let dispatcher = EventDispatcher::default();
    Services {
        requests: RequestService::new(
            shared.clone(),
            shared.clone(),
            dispatcher.clone(),
            CredentialConfig::default(),
        ),
        devices: DeviceService::new(shared.clone(), dispatcher.clone(), &tracking),
        credentials: CredentialService::new(
            shared.clone(),
            dispatcher,
            CredentialConfig::default(),
            &tracking,
        ),
        ingestion: IngestionService::new(shared.clone(), shared.clone(), tracking.clone()),
        history: HistoryService::new(shared.clone(), shared, tracking),
    }
}

pub(crate) fn user() -> RequestContext {
    RequestContext::new(Uuid::new_v4(), UserRole::User, Some("Field Tech".into()))
}

pub(crate) fn manager() -> RequestContext {
    RequestContext::new(
        Uuid::new_v4(),
        UserRole::Manager,
        Some("Fleet Manager".into()),
    )
}

pub(crate) fn admin() -> RequestContext {
    RequestContext::new(Uuid::new_v4(), UserRole::Admin, None)
}

pub(crate) fn item(name: &str) -> NewLineItem {
    NewLineItem {
        name: name.to_string(),
        purpose: "Asset tracking".to_string(),
        model: Some("GT-200".to_string()),
        category: Some("tracker".to_string()),
    }
}

/// Submit a one-item request as `owner` and approve it as a manager.
pub(crate) async fn provision(services: &Services, owner: &RequestContext) -> Device {
    let request = services
        .requests
        .submit_request(
            owner,
            SubmitRequest {
                items: vec![item("Van tracker")],
                priority: None,
                department: None,
            },
        )
        .await
        .unwrap();
    services
        .requests
        .approve_line_item(&manager(), request.id, 0, None)
        .await
        .unwrap()
        .device
}
