//! Serial port discovery
//!
//! Enumerates candidate endpoints and resolves them to one device. Selection
//! is a pure classification over the candidate list so the heuristics are
//! testable without hardware; only the ambiguous case needs an external
//! decision (the CLI prompts when it can).

use serialport::{SerialPortInfo, SerialPortType};
use tracing::{debug, warn};

use super::error::AcquisitionError;

/// Descriptor substrings that identify the sensor device
///
/// Matches the usual USB-serial bridges the device enumerates as.
pub const DEVICE_HINTS: &[&str] = &["Arduino", "CH340", "USB"];

/// One enumerated serial endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    /// OS port name, e.g. `/dev/ttyUSB0` or `COM3`
    pub name: String,
    /// Human-readable descriptor used for heuristic matching
    pub description: String,
}

impl PortCandidate {
    /// Build a candidate from a port enumeration entry
    pub fn from_info(info: &SerialPortInfo) -> Self {
        let description = match &info.port_type {
            SerialPortType::UsbPort(usb) => {
                let mut parts = Vec::new();
                if let Some(manufacturer) = &usb.manufacturer {
                    parts.push(manufacturer.clone());
                }
                if let Some(product) = &usb.product {
                    parts.push(product.clone());
                }
                if parts.is_empty() {
                    format!("USB {:04x}:{:04x}", usb.vid, usb.pid)
                } else {
                    parts.join(" ")
                }
            }
            SerialPortType::PciPort => "PCI serial".to_string(),
            SerialPortType::BluetoothPort => "Bluetooth serial".to_string(),
            SerialPortType::Unknown => "Unknown".to_string(),
        };
        Self {
            name: info.port_name.clone(),
            description,
        }
    }
}

/// Outcome of port classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortChoice {
    /// Exactly one acceptable endpoint
    Definite(PortCandidate),
    /// Several endpoints and no unique heuristic match; requires an
    /// external decision
    Ambiguous(Vec<PortCandidate>),
}

/// Classify the candidate list
///
/// A single candidate is selected outright. With several, a unique
/// descriptor match against [`DEVICE_HINTS`] decides; otherwise the whole
/// list is returned for external selection.
pub fn classify(mut candidates: Vec<PortCandidate>) -> PortChoice {
    if candidates.len() == 1 {
        return PortChoice::Definite(candidates.remove(0));
    }

    let mut hits: Vec<&PortCandidate> = candidates
        .iter()
        .filter(|c| DEVICE_HINTS.iter().any(|hint| c.description.contains(hint)))
        .collect();

    if hits.len() == 1 {
        let hit = hits.remove(0).clone();
        return PortChoice::Definite(hit);
    }

    PortChoice::Ambiguous(candidates)
}

/// Locator over the host's serial endpoints
#[derive(Debug, Default)]
pub struct PortLocator;

impl PortLocator {
    /// Enumerate the host's serial endpoints
    pub fn candidates(&self) -> Vec<PortCandidate> {
        let ports = serialport::available_ports().unwrap_or_else(|e| {
            warn!("port enumeration failed: {e}");
            Vec::new()
        });
        let candidates: Vec<PortCandidate> = ports.iter().map(PortCandidate::from_info).collect();
        for candidate in &candidates {
            debug!("found port {} ({})", candidate.name, candidate.description);
        }
        candidates
    }

    /// Enumerate endpoints and resolve to a choice
    ///
    /// Fails with [`AcquisitionError::NoPortFound`] when zero candidates
    /// exist; this aborts before any device interaction.
    pub fn locate(&self) -> Result<PortChoice, AcquisitionError> {
        let candidates = self.candidates();
        if candidates.is_empty() {
            return Err(AcquisitionError::NoPortFound);
        }
        Ok(classify(candidates))
    }
}
