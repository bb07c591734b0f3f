//! Business logic services

pub mod attendance;
pub mod broadcast;
pub mod calendar;
pub mod dialogue;
pub mod exports;
pub mod lookup;
pub mod permissions;
pub mod qr;
pub mod redis;
pub mod registration;
pub mod reports;
pub mod staff;

use std::{sync::Arc, time::Duration};

use crate::{config::AppConfig, repository::Repository, telegram::Messenger};

use dialogue::DialogueStore;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub permissions: permissions::PermissionService,
    pub lookup: lookup::LookupService,
    pub attendance: attendance::AttendanceService,
    pub registration: registration::RegistrationService,
    pub broadcast: broadcast::BroadcastService,
    pub staff: staff::StaffService,
    pub reports: reports::ReportService,
    pub exports: exports::ExportService,
    pub qr: qr::QrService,
    pub dialogues: Arc<dyn DialogueStore>,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        config: &AppConfig,
        messenger: Arc<dyn Messenger>,
        dialogues: Arc<dyn DialogueStore>,
    ) -> Self {
        let offset = calendar::offset_from_minutes(config.venue.utc_offset_minutes);
        let permissions = permissions::PermissionService::new(repository.clone(), config.access.clone());

        Self {
            lookup: lookup::LookupService::new(repository.clone()),
            attendance: attendance::AttendanceService::new(
                repository.clone(),
                permissions.clone(),
                messenger.clone(),
                offset,
            ),
            registration: registration::RegistrationService::new(
                repository.clone(),
                dialogues.clone(),
                messenger.clone(),
                config.access.clone(),
                config.venue.clone(),
            ),
            broadcast: broadcast::BroadcastService::new(
                repository.clone(),
                permissions.clone(),
                messenger.clone(),
                Duration::from_millis(config.broadcast.delay_ms),
            ),
            staff: staff::StaffService::new(repository.clone(), permissions.clone()),
            reports: reports::ReportService::new(repository.clone(), permissions.clone(), offset),
            exports: exports::ExportService::new(
                repository.clone(),
                permissions.clone(),
                config.venue.name.clone(),
                offset,
            ),
            qr: qr::QrService::new(repository, permissions.clone(), messenger),
            permissions,
            dialogues,
        }
    }
}
