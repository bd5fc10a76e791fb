use chrono::NaiveDate;
use serde_json::json;

use super::Dashboard;
use crate::cache::QueryKey;
use crate::error::Result;
use crate::models::{Class, DashboardStats, LowAttendanceWarning};
use crate::store::{decode, DASHBOARD_STATS_RPC};

/// How many of today's classes and warnings the home page shows
const PREVIEW_LEN: usize = 5;

/// Everything the dashboard home page shows
#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub stats: DashboardStats,
    pub todays_classes: Vec<Class>,
    pub warnings: Vec<LowAttendanceWarning>,
}

impl Dashboard {
    /// Summary counts from `get_dashboard_stats`
    pub async fn stats(&self) -> Result<DashboardStats> {
        let store = self.store();
        self.cache()
            .get_or_fetch(QueryKey::DashboardStats, || async move {
                decode::<DashboardStats>(store.rpc(DASHBOARD_STATS_RPC, json!({})).await?)
            })
            .await
    }

    pub async fn overview(&self, today: NaiveDate) -> Result<Overview> {
        let stats = self.stats().await?;
        let mut todays_classes = self.classes().today(today).await?;
        let mut warnings = self.attendance().low_attendance().await?;
        todays_classes.truncate(PREVIEW_LEN);
        warnings.truncate(PREVIEW_LEN);

        Ok(Overview {
            stats,
            todays_classes,
            warnings,
        })
    }
}
