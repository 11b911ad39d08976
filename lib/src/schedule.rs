//! Upstream journey records and next-departure selection.
//!
//! The feed returns a JSON array of journeys; each journey's first leg
//! carries the planned departure and arrival the board shows. Stop names are
//! semi-structured text ("Central, Platform 16"), so the station and
//! platform parts are split by explicit substring search rather than any
//! schema assumption.

use serde::Deserialize;

use crate::clock::{self, TzRule};
use crate::error::FetchError;

/// Token introducing the platform part of an upstream stop name.
const PLATFORM_MARKER: &str = "Platform ";

#[derive(Debug, Clone, Deserialize)]
pub struct Journey {
    #[serde(default)]
    pub legs: Vec<Leg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Leg {
    pub origin: Stop,
    pub destination: Stop,
    #[serde(default)]
    pub transportation: Transportation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Stop {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "departureTimePlanned")]
    pub departure_time_planned: Option<String>,
    #[serde(rename = "arrivalTimePlanned")]
    pub arrival_time_planned: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transportation {
    #[serde(rename = "disassembledName", default)]
    pub disassembled_name: String,
}

/// Error body shape some upstream failures carry. Its text is surfaced
/// verbatim in the failure view.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(default)]
    pub details: Option<String>,
}

/// One journey's first leg, flattened to the fields the board consumes.
/// Immutable once constructed; discarded at the end of the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLeg {
    pub origin_name: String,
    pub origin_departure_utc: String,
    pub destination_name: String,
    pub destination_arrival_utc: String,
    pub route_code: String,
}

impl ServiceLeg {
    /// Flatten a journey's first leg. `None` when the record is structurally
    /// incomplete: no legs, or a missing planned time.
    pub fn from_journey(journey: &Journey) -> Option<Self> {
        let leg = journey.legs.first()?;
        Some(ServiceLeg {
            origin_name: leg.origin.name.clone(),
            origin_departure_utc: leg.origin.departure_time_planned.clone()?,
            destination_name: leg.destination.name.clone(),
            destination_arrival_utc: leg.destination.arrival_time_planned.clone()?,
            route_code: leg.transportation.disassembled_name.clone(),
        })
    }
}

/// Display-ready text for the two-column departure layout. Derived
/// deterministically from a [`ServiceLeg`]; the renderer never sees raw
/// response data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartureView {
    pub origin_station: String,
    pub origin_platform: String,
    pub origin_time: String,
    pub dest_station: String,
    pub dest_platform: String,
    pub dest_time: String,
    pub route_label: String,
}

impl DepartureView {
    pub fn from_leg(leg: &ServiceLeg, rule: &TzRule) -> Result<Self, FetchError> {
        Ok(DepartureView {
            origin_station: extract_station(&leg.origin_name).to_string(),
            origin_platform: extract_platform(&leg.origin_name).to_string(),
            origin_time: clock::to_local_display(&leg.origin_departure_utc, rule)?,
            dest_station: extract_station(&leg.destination_name).to_string(),
            dest_platform: extract_platform(&leg.destination_name).to_string(),
            dest_time: clock::to_local_display(&leg.destination_arrival_utc, rule)?,
            route_label: route_label(&leg.route_code).to_string(),
        })
    }
}

/// The contract between fetching and rendering.
pub type FetchOutcome = Result<DepartureView, FetchError>;

/// Deserialize a 2xx response body into journey records.
pub fn parse_body(body: &str) -> Result<Vec<Journey>, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::MalformedResponse(e.to_string()))
}

/// Select the next not-yet-departed service: the first record whose first
/// leg departs at or after `now_epoch`.
///
/// Records that are structurally incomplete or whose departure time fails to
/// parse are skipped, and selection continues with the rest of the sequence.
/// When every usable record has already departed, the first usable one is
/// returned anyway so a stale feed still puts something on the board; only a
/// genuinely empty sequence yields [`FetchError::NoData`].
pub fn select_next(journeys: &[Journey], now_epoch: i64) -> Result<ServiceLeg, FetchError> {
    if journeys.is_empty() {
        return Err(FetchError::NoData);
    }

    let mut fallback: Option<ServiceLeg> = None;
    for journey in journeys {
        let Some(leg) = ServiceLeg::from_journey(journey) else {
            log::warn!("skipping incomplete journey record");
            continue;
        };
        let departs = match clock::utc_iso_to_epoch(&leg.origin_departure_utc) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("skipping record: {e}");
                continue;
            }
        };
        if departs >= now_epoch {
            return Ok(leg);
        }
        if fallback.is_none() {
            fallback = Some(leg);
        }
    }

    fallback.ok_or_else(|| {
        FetchError::MalformedResponse(format!(
            "none of {} records had a usable first leg",
            journeys.len()
        ))
    })
}

/// Station title: everything before the first comma, or the whole name when
/// there is none.
pub fn extract_station(name: &str) -> &str {
    match name.find(',') {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// Platform part of a stop name: from the `"Platform "` marker up to but
/// excluding the next comma, or to the end of the string. Empty when the
/// marker is absent.
pub fn extract_platform(name: &str) -> &str {
    let Some(start) = name.find(PLATFORM_MARKER) else {
        return "";
    };
    let rest = &name[start..];
    match rest.find(',') {
        Some(end) => &rest[..end],
        None => rest,
    }
}

/// Human label for an upstream route code. Unrecognized codes pass through
/// unchanged.
pub fn route_label(code: &str) -> &str {
    match code {
        "BMT" => "Intercity",
        "T1" => "T1",
        _ => code,
    }
}
