use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_derive::Serialize;

use crate::indicators::IconUpdate;
use crate::monitor::{NavigationRequest, Page};

// ////////// //
// Navigation //
// ////////// //

#[derive(Debug, Serialize)]
pub struct MqttNavigation {
    pub page: Page,
    pub href: String,
    pub params: BTreeMap<String, String>,
    pub issued_at: DateTime<Utc>,
}

impl From<&NavigationRequest> for MqttNavigation {
    fn from(request: &NavigationRequest) -> Self {
        MqttNavigation {
            page: request.page,
            href: request.to_href(),
            params: request.params.iter().cloned().collect(),
            issued_at: Utc::now(),
        }
    }
}

// ///// //
// Icons //
// ///// //

#[derive(Debug, Serialize)]
pub struct MqttIcon {
    pub indicator: String,
    pub icon: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&IconUpdate> for MqttIcon {
    fn from(update: &IconUpdate) -> Self {
        MqttIcon {
            indicator: update.indicator.name(),
            icon: update.icon.clone(),
            updated_at: Utc::now(),
        }
    }
}
