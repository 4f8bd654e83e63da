use std::fmt;

use chrono::{DateTime, Utc};

use crate::{errors::Error, tracking::TrackingNumber, Result};

/// Chat-side identity of the person being notified (a Telegram chat id today).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecipientId(pub String);

impl RecipientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shipment status vocabulary shared with the admin surface.
///
/// Values written by other tools that fall outside the vocabulary are kept as
/// `Unrecognized` so they can still be displayed and diffed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    OrderPlaced,
    Processing,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    FailedDelivery,
    Returned,
    Custom,
    Unrecognized(String),
}

const GENERIC_EMOJI: &str = "📋";

impl Status {
    /// Every status an admin may assign.
    pub const VOCABULARY: [Status; 9] = [
        Status::OrderPlaced,
        Status::Processing,
        Status::PickedUp,
        Status::InTransit,
        Status::OutForDelivery,
        Status::Delivered,
        Status::FailedDelivery,
        Status::Returned,
        Status::Custom,
    ];

    pub fn label(&self) -> &str {
        match self {
            Status::Unrecognized(s) => s,
            known => known.vocabulary_label().unwrap_or_default(),
        }
    }

    /// Label for vocabulary members; `None` for `Unrecognized`.
    pub fn vocabulary_label(&self) -> Option<&'static str> {
        let label = match self {
            Status::OrderPlaced => "Order Placed",
            Status::Processing => "Processing",
            Status::PickedUp => "Picked Up",
            Status::InTransit => "In Transit",
            Status::OutForDelivery => "Out for Delivery",
            Status::Delivered => "Delivered",
            Status::FailedDelivery => "Failed Delivery",
            Status::Returned => "Returned",
            Status::Custom => "Custom Status",
            Status::Unrecognized(_) => return None,
        };
        Some(label)
    }

    /// Lenient parse used when reading records back from a store.
    pub fn from_label(label: &str) -> Self {
        Self::VOCABULARY
            .iter()
            .find(|s| s.label() == label)
            .cloned()
            .unwrap_or_else(|| Status::Unrecognized(label.to_string()))
    }

    /// Strict parse used at the admin-write boundary.
    pub fn validate(label: &str) -> Result<Self> {
        match Self::from_label(label.trim()) {
            Status::Unrecognized(s) => Err(Error::UnknownStatus(s)),
            s => Ok(s),
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Status::OrderPlaced => "📦",
            Status::Processing => "⚙️",
            Status::PickedUp => "🚚",
            Status::InTransit => "✈️",
            Status::OutForDelivery => "🚛",
            Status::Delivered => "✅",
            Status::FailedDelivery => "❌",
            Status::Returned => "↩️",
            Status::Custom | Status::Unrecognized(_) => GENERIC_EMOJI,
        }
    }

    /// Fixed detail text for vocabulary statuses; `Custom Status` carries free text.
    pub fn suggested_detail(&self) -> Option<&'static str> {
        match self {
            Status::OrderPlaced => Some("Your order has been placed and is being processed."),
            Status::Processing => Some("Your package is being processed at our facility."),
            Status::PickedUp => Some("Your package has been picked up by our courier."),
            Status::InTransit => Some("Your package is on its way to the destination."),
            Status::OutForDelivery => Some("Your package is out for delivery today."),
            Status::Delivered => Some("Your package has been successfully delivered."),
            Status::FailedDelivery => Some("Delivery was attempted but unsuccessful."),
            Status::Returned => Some("Your package has been returned to sender."),
            Status::Custom | Status::Unrecognized(_) => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One tracked shipment as persisted by a `TrackingStore`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackingRecord {
    pub tracking_number: TrackingNumber,
    pub recipient_id: RecipientId,
    pub status: Status,
    pub status_detail: String,
    pub last_updated: DateTime<Utc>,
}

impl TrackingRecord {
    /// Record for a freshly registered shipment.
    pub fn registered(
        tracking_number: TrackingNumber,
        recipient_id: RecipientId,
        now: DateTime<Utc>,
    ) -> Self {
        let status = Status::OrderPlaced;
        let status_detail = status.suggested_detail().unwrap_or_default().to_string();
        Self {
            tracking_number,
            recipient_id,
            status,
            status_detail,
            last_updated: now,
        }
    }
}
