//! Org API limit check
//!
//! Reports how much of each configured daily limit is already used and
//! warns once the used share crosses the configured threshold.

use crate::api::SalesforceApi;
use crate::config::LimitsConfig;
use crate::errors::ExtractorResult;
use crate::models::OrgLimits;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum LimitStatus {
    Ok { name: String, used: f64, remaining: u64, max: u64 },
    OverThreshold { name: String, used: f64, remaining: u64, max: u64 },
    Missing { name: String },
}

impl LimitStatus {
    pub fn is_over_threshold(&self) -> bool {
        matches!(self, LimitStatus::OverThreshold { .. })
    }
}

/// Pure evaluation of a limits response.
pub fn evaluate_limits(limits: &OrgLimits, config: &LimitsConfig) -> Vec<LimitStatus> {
    config
        .names
        .iter()
        .map(|name| match limits.get(name) {
            None => LimitStatus::Missing { name: name.clone() },
            Some(limit) => {
                let used = if limit.max == 0 {
                    0.0
                } else {
                    limit.max.saturating_sub(limit.remaining) as f64 / limit.max as f64
                };
                if used > config.warn_threshold {
                    LimitStatus::OverThreshold {
                        name: name.clone(),
                        used,
                        remaining: limit.remaining,
                        max: limit.max,
                    }
                } else {
                    LimitStatus::Ok {
                        name: name.clone(),
                        used,
                        remaining: limit.remaining,
                        max: limit.max,
                    }
                }
            }
        })
        .collect()
}

pub fn check_limits<A: SalesforceApi + ?Sized>(
    api: &A,
    config: &LimitsConfig,
) -> ExtractorResult<Vec<LimitStatus>> {
    let limits = api.limits()?;
    let statuses = evaluate_limits(&limits, config);

    for status in &statuses {
        match status {
            LimitStatus::Ok { name, used, remaining, max } => {
                info!(limit = %name, remaining, max, used = %format!("{:.0}%", used * 100.0), "org limit");
            }
            LimitStatus::OverThreshold { name, used, remaining, max } => {
                warn!(limit = %name, remaining, max, used = %format!("{:.0}%", used * 100.0), "org limit above threshold");
            }
            LimitStatus::Missing { name } => warn!(limit = %name, "limit not reported by org"),
        }
    }
    Ok(statuses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrgLimit;

    fn limits() -> OrgLimits {
        let mut limits = OrgLimits::new();
        limits.insert("DailyApiRequests".into(), OrgLimit { max: 15000, remaining: 14000 });
        limits.insert("DailyBulkApiRequests".into(), OrgLimit { max: 10000, remaining: 1000 });
        limits.insert("DailyStreamingApiEvents".into(), OrgLimit { max: 0, remaining: 0 });
        limits
    }

    #[test]
    fn classifies_each_configured_limit() {
        let statuses = evaluate_limits(&limits(), &LimitsConfig::default());

        assert_eq!(statuses.len(), 4);
        assert!(matches!(&statuses[0], LimitStatus::Ok { name, .. } if name == "DailyApiRequests"));
        assert!(matches!(&statuses[1], LimitStatus::Missing { name } if name == "DailyAsyncApexExecutions"));
        assert!(statuses[2].is_over_threshold());
        assert!(matches!(&statuses[3], LimitStatus::Ok { used, .. } if *used == 0.0));
    }

    #[test]
    fn threshold_is_configurable() {
        let cfg = LimitsConfig {
            warn_threshold: 0.95,
            names: vec!["DailyBulkApiRequests".into()],
        };
        let statuses = evaluate_limits(&limits(), &cfg);
        assert!(!statuses[0].is_over_threshold());
    }
}
