//! Scheduling constraints supplied by the caller.
//!
//! Every field has a sane default so a partially specified JSON object
//! deserializes into a usable configuration.

use serde::{Deserialize, Serialize};

use super::ClinicalDomain;

/// Default maximum chair time per visit (minutes).
pub const DEFAULT_MAX_APPOINTMENT_MINUTES: i64 = 120;

/// Default minimum gap between dependent visits (days).
pub const DEFAULT_MIN_DAYS_BETWEEN_VISITS: u32 = 7;

/// Caller-supplied scheduling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConstraints {
    /// Maximum chair minutes per visit. Must be positive.
    pub max_appointment_minutes: i64,
    /// Providers that can be attached to visits.
    pub providers: Vec<Provider>,
    pub preferences: PatientPreferences,
    /// Lower bound applied to every dependency gap (days).
    pub min_days_between_visits: u32,
    pub mobility: MobilityLevel,
    /// Procedures to treat as urgent regardless of their recorded priority.
    pub urgent_procedure_ids: Vec<String>,
}

impl Default for SchedulingConstraints {
    fn default() -> Self {
        Self {
            max_appointment_minutes: DEFAULT_MAX_APPOINTMENT_MINUTES,
            providers: Vec::new(),
            preferences: PatientPreferences::default(),
            min_days_between_visits: DEFAULT_MIN_DAYS_BETWEEN_VISITS,
            mobility: MobilityLevel::default(),
            urgent_procedure_ids: Vec::new(),
        }
    }
}

impl SchedulingConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_appointment_minutes(mut self, minutes: i64) -> Self {
        self.max_appointment_minutes = minutes;
        self
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_preferences(mut self, preferences: PatientPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_min_days_between_visits(mut self, days: u32) -> Self {
        self.min_days_between_visits = days;
        self
    }

    pub fn with_mobility(mut self, mobility: MobilityLevel) -> Self {
        self.mobility = mobility;
        self
    }

    pub fn with_urgent_procedure(mut self, procedure_id: impl Into<String>) -> Self {
        self.urgent_procedure_ids.push(procedure_id.into());
        self
    }

    /// Visit cap after applying the patient's own preference.
    ///
    /// Non-positive values collapse to zero; validation rejects them before
    /// packing.
    pub fn effective_max_minutes(&self) -> u32 {
        let cap = match self.preferences.max_visit_minutes {
            Some(preferred) => preferred.min(self.max_appointment_minutes),
            None => self.max_appointment_minutes,
        };
        u32::try_from(cap.max(0)).unwrap_or(u32::MAX)
    }

    /// Whether the procedure is listed as an urgent override.
    pub fn is_urgent_override(&self, procedure_id: &str) -> bool {
        self.urgent_procedure_ids.iter().any(|id| id == procedure_id)
    }
}

/// Patient scheduling preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientPreferences {
    /// Longest visit the patient is willing to sit through (minutes).
    pub max_visit_minutes: Option<i64>,
    /// Provider to prefer when several match a procedure's domain.
    pub preferred_provider_id: Option<String>,
}

impl PatientPreferences {
    pub fn with_max_visit_minutes(mut self, minutes: i64) -> Self {
        self.max_visit_minutes = Some(minutes);
        self
    }

    pub fn with_preferred_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.preferred_provider_id = Some(provider_id.into());
        self
    }
}

/// Patient mobility level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MobilityLevel {
    #[default]
    Full,
    Limited,
    Wheelchair,
}

impl MobilityLevel {
    /// Visit note for patients that need accommodation.
    pub fn visit_note(&self) -> Option<&'static str> {
        match self {
            Self::Full => None,
            Self::Limited => {
                Some("Limited mobility: allow extra time for seating and transfer")
            }
            Self::Wheelchair => {
                Some("Wheelchair user: book an accessible operatory and allow transfer time")
            }
        }
    }
}

/// A clinician that can be attached to visits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Domains this provider performs.
    #[serde(default)]
    pub specialties: Vec<ClinicalDomain>,
    /// Whether the provider currently takes bookings.
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl Provider {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            specialties: Vec::new(),
            available: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_specialty(mut self, domain: ClinicalDomain) -> Self {
        self.specialties.push(domain);
        self
    }

    /// Marks the provider as not taking bookings.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Whether this provider can take a procedure in `domain`.
    pub fn handles(&self, domain: ClinicalDomain) -> bool {
        self.available && self.specialties.contains(&domain)
    }
}
