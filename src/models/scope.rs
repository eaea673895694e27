// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitbit data scopes and their endpoint descriptors.

use chrono::NaiveDate;

/// A named data capability that maps to exactly one Fitbit endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataScope {
    UserInfo,
    Sleep,
    HeartRate,
    HeartRateVariability,
    BreathingRate,
    SpO2,
    Activity,
}

/// Top-level JSON shape a successful response must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// JSON array (device listing)
    List,
    /// JSON object
    Document,
}

impl ResponseShape {
    pub fn matches(self, payload: &serde_json::Value) -> bool {
        match self {
            ResponseShape::List => payload.is_array(),
            ResponseShape::Document => payload.is_object(),
        }
    }
}

/// Static description of a Fitbit data endpoint.
#[derive(Debug, Clone, Copy)]
pub struct EndpointDescriptor {
    /// Path relative to the API base URL; `{date}` is substituted
    pub path_template: &'static str,
    pub requires_date: bool,
    pub shape: ResponseShape,
}

/// Scopes fetched for every user by the daily bulk job.
pub const DAILY_SCOPES: [DataScope; 6] = [
    DataScope::Sleep,
    DataScope::HeartRate,
    DataScope::HeartRateVariability,
    DataScope::BreathingRate,
    DataScope::SpO2,
    DataScope::Activity,
];

impl DataScope {
    pub const ALL: [DataScope; 7] = [
        DataScope::UserInfo,
        DataScope::Sleep,
        DataScope::HeartRate,
        DataScope::HeartRateVariability,
        DataScope::BreathingRate,
        DataScope::SpO2,
        DataScope::Activity,
    ];

    /// Look up a scope by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scope| scope.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            DataScope::UserInfo => "user_info",
            DataScope::Sleep => "sleep",
            DataScope::HeartRate => "heart_rate",
            DataScope::HeartRateVariability => "heart_rate_variability",
            DataScope::BreathingRate => "breathing_rate",
            DataScope::SpO2 => "spO2",
            DataScope::Activity => "activity",
        }
    }

    pub fn endpoint(self) -> EndpointDescriptor {
        use ResponseShape::{Document, List};

        let (path_template, requires_date, shape) = match self {
            // Paired devices
            DataScope::UserInfo => ("/1/user/-/devices.json", false, List),
            // Sleep log: duration, efficiency and stage minutes
            DataScope::Sleep => ("/1.2/user/-/sleep/date/{date}.json", true, Document),
            // Intraday heart rate at 1 second resolution
            DataScope::HeartRate => (
                "/1/user/-/activities/heart/date/{date}/1d/1sec.json",
                true,
                Document,
            ),
            DataScope::HeartRateVariability => ("/1/user/-/hrv/date/{date}/all.json", true, Document),
            // Respiratory rate by sleep stage
            DataScope::BreathingRate => ("/1/user/-/br/date/{date}/all.json", true, Document),
            DataScope::SpO2 => ("/1/user/-/spo2/date/{date}/all.json", true, Document),
            // Intraday steps at 1 minute resolution
            DataScope::Activity => (
                "/1/user/-/activities/steps/date/{date}/1d/1min.json",
                true,
                Document,
            ),
        };

        EndpointDescriptor {
            path_template,
            requires_date,
            shape,
        }
    }

    /// Resolve the endpoint path for this scope.
    ///
    /// Returns `None` when the endpoint needs a date and none was given.
    pub fn path(self, date: Option<NaiveDate>) -> Option<String> {
        let endpoint = self.endpoint();
        if !endpoint.requires_date {
            return Some(endpoint.path_template.to_string());
        }
        let date = date?;
        Some(
            endpoint
                .path_template
                .replace("{date}", &date.format("%Y-%m-%d").to_string()),
        )
    }
}

impl std::fmt::Display for DataScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scope in DataScope::ALL {
            assert_eq!(DataScope::from_name(scope.name()), Some(scope));
        }
        assert_eq!(DataScope::from_name("steps"), None);
        // Names are case sensitive
        assert_eq!(DataScope::from_name("spo2"), None);
    }

    #[test]
    fn test_path_substitutes_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            DataScope::Sleep.path(Some(date)).unwrap(),
            "/1.2/user/-/sleep/date/2024-01-15.json"
        );
        assert_eq!(
            DataScope::Activity.path(Some(date)).unwrap(),
            "/1/user/-/activities/steps/date/2024-01-15/1d/1min.json"
        );
    }

    #[test]
    fn test_path_requires_date() {
        assert_eq!(DataScope::HeartRate.path(None), None);
        assert_eq!(
            DataScope::UserInfo.path(None).unwrap(),
            "/1/user/-/devices.json"
        );
    }

    #[test]
    fn test_only_user_info_is_dateless() {
        for scope in DataScope::ALL {
            assert_eq!(
                scope.endpoint().requires_date,
                scope != DataScope::UserInfo,
                "{scope}"
            );
        }
        assert!(!DAILY_SCOPES.contains(&DataScope::UserInfo));
    }

    #[test]
    fn test_response_shape() {
        assert!(ResponseShape::List.matches(&serde_json::json!([])));
        assert!(!ResponseShape::List.matches(&serde_json::json!({})));
        assert!(ResponseShape::Document.matches(&serde_json::json!({"sleep": []})));
    }
}
