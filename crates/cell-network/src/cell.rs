//! Run-wide cellular settings: header sizes and bandwidth measurement.

use cell_core::time::SECOND;
use cell_core::{Protocol, TransmissionMode};
use serde::{Deserialize, Serialize};

use crate::{NetworkError, NetworkResult};

/// Matches any region or application class in a [`MeasurementFilter`].
pub const WILDCARD: &str = "*";

// ── HeaderLengths ─────────────────────────────────────────────────────────────

/// Per-layer header sizes in bits, added to every payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeaderLengths {
    pub cellular_header: u64,
    pub ethernet_header: u64,
    pub ip_header: u64,
    pub udp_header: u64,
    pub tcp_header: u64,
}

impl Default for HeaderLengths {
    fn default() -> Self {
        Self {
            cellular_header: 18 * 8,
            ethernet_header: 14 * 8,
            ip_header: 20 * 8,
            udp_header: 8 * 8,
            tcp_header: 20 * 8,
        }
    }
}

impl HeaderLengths {
    /// On-air size in bits: link layer + IP + transport + payload.
    ///
    /// Servers sit on the wired backbone and use the ethernet header; every
    /// other unit is on the cellular link.
    pub fn message_length(&self, payload_bytes: u64, protocol: Protocol, server: bool) -> u64 {
        let link = if server { self.ethernet_header } else { self.cellular_header };
        let transport = match protocol {
            Protocol::Udp => self.udp_header,
            Protocol::Tcp => self.tcp_header,
        };
        link + self.ip_header + transport + payload_bytes * 8
    }
}

// ── Measurement ───────────────────────────────────────────────────────────────

/// Which transmissions one bandwidth measurement file collects.
///
/// `from_region`, `to_region` and `application_class` accept [`WILDCARD`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementFilter {
    pub from_region: String,
    pub to_region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission_mode: Option<TransmissionMode>,
    #[serde(default = "wildcard")]
    pub application_class: String,
}

fn wildcard() -> String {
    WILDCARD.to_owned()
}

impl MeasurementFilter {
    pub fn new(from: &str, to: &str, application_class: &str) -> Self {
        Self {
            from_region: from.to_owned(),
            to_region: to.to_owned(),
            transmission_mode: None,
            application_class: application_class.to_owned(),
        }
    }

    pub fn with_mode(mut self, mode: TransmissionMode) -> Self {
        self.transmission_mode = Some(mode);
        self
    }

    pub fn matches(&self, from: &str, to: &str, mode: TransmissionMode, class: &str) -> bool {
        field_matches(&self.from_region, from)
            && field_matches(&self.to_region, to)
            && field_matches(&self.application_class, class)
            && self.transmission_mode.is_none_or(|m| m == mode)
    }

    /// `<from>#<to>#<class>` with wildcards written as `ALL`.  A fully
    /// wildcarded filter restricted to one link direction gets `#Up` or
    /// `#Dn` appended.
    pub fn file_stem(&self) -> String {
        let mut stem = format!(
            "{}#{}#{}",
            display_field(&self.from_region),
            display_field(&self.to_region),
            display_field(&self.application_class)
        );
        let all_wildcards = [&self.from_region, &self.to_region, &self.application_class]
            .iter()
            .all(|f| f.as_str() == WILDCARD);
        if let (true, Some(mode)) = (all_wildcards, self.transmission_mode) {
            stem.push_str(if mode.is_uplink() { "#Up" } else { "#Dn" });
        }
        stem
    }
}

fn field_matches(pattern: &str, value: &str) -> bool {
    pattern == WILDCARD || pattern == value
}

fn display_field(field: &str) -> &str {
    if field == WILDCARD { "ALL" } else { field }
}

// ── Export ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    pub field_separator: char,
    pub decimal_separator: char,
    /// Append to existing files instead of truncating them.
    pub append: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { field_separator: ';', decimal_separator: '.', append: false }
    }
}

// ── CellConfig ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CellConfig {
    pub header_lengths: HeaderLengths,
    /// Bucket width of the bandwidth measurements, in seconds.
    pub bandwidth_measurement_interval: f64,
    pub bandwidth_measurement_compression: bool,
    pub bandwidth_measurements: Vec<MeasurementFilter>,
    pub export: ExportConfig,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            header_lengths: HeaderLengths::default(),
            bandwidth_measurement_interval: 1.0,
            bandwidth_measurement_compression: false,
            bandwidth_measurements: Vec::new(),
            export: ExportConfig::default(),
        }
    }
}

impl CellConfig {
    pub fn validate(&self) -> NetworkResult<()> {
        let interval = self.bandwidth_measurement_interval;
        if !(interval > 0.0 && interval.is_finite()) || self.measurement_interval_ns() == 0 {
            return Err(NetworkError::InvalidInterval(interval));
        }
        Ok(())
    }

    /// Measurement bucket width in nanoseconds.
    pub fn measurement_interval_ns(&self) -> u64 {
        (self.bandwidth_measurement_interval * SECOND as f64).round() as u64
    }
}
