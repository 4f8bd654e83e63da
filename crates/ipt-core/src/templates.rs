//! Chat message templates (Telegram HTML).

use chrono::{DateTime, Utc};

use crate::{
    domain::{Status, TrackingRecord},
    formatting::{escape_html, human_timestamp},
    tracking::TrackingNumber,
};

pub const FOOTER: &str = "<i>This is an automated message. Please do not reply.</i>";

pub const HELP: &str = "
📦 <b>India Post Tracking Bot Help</b>

<b>Available Commands:</b>

/track &lt;tracking_number&gt; - Track a new package
/help - Show this help message
/status - Check status of all tracked packages

<b>Tracking Number Format:</b>
- Speed Post: <code>EU430410927IN</code>
- Registered Post: <code>RM286760959IN</code>
- Air Waybill: <code>AW595537795IN</code>

<b>Format Rules:</b>
1. Start with 2 capital letters:
   - E for Speed Post
   - R for Registered Post
   - A for Air Waybill
2. Have 9 numbers in the middle
3. End with 'IN'
4. No spaces allowed

<b>Example Usage:</b>
<code>/track EU430410927IN</code>

<b>Status Updates:</b>
You will receive automatic updates when your package status changes.

<i>This is an automated message. Please do not reply.</i>
";

pub const TRACK_USAGE: &str = "
❌ <b>Invalid Command</b>

Usage: <code>/track &lt;tracking_number&gt;</code>

Example: <code>/track EU430410927IN</code>

<i>This is an automated message. Please do not reply.</i>
";

pub const INVALID_TRACKING_NUMBER: &str = "
❌ <b>Invalid Tracking Number Format</b>

Please provide a valid India Post tracking number in the following format:
- Speed Post: <code>EU430410927IN</code>
- Registered Post: <code>RM286760959IN</code>
- Air Waybill: <code>AW595537795IN</code>

The tracking number should:
1. Start with 2 capital letters (E for Speed Post, R for Registered Post, A for Air Waybill)
2. Have 9 numbers in the middle
3. End with 'IN'

<i>This is an automated message. Please do not reply.</i>
";

pub const NO_TRACKED_PACKAGES: &str = "
📋 <b>No Tracked Packages</b>

You haven't tracked any packages yet. Use <code>/track &lt;tracking_number&gt;</code> to start tracking.

<i>This is an automated message. Please do not reply.</i>
";

pub const UNKNOWN_COMMAND: &str = "
❌ <b>Unknown Command</b>

Use <code>/help</code> to see available commands.

<i>This is an automated message. Please do not reply.</i>
";

pub const REGISTRATION_FAILED: &str =
    "❌ Sorry, there was an error registering your tracking number.";

pub const STATUS_LISTING_HEADER: &str = "📋 <b>Your Tracked Packages</b>\n\n";

pub fn tracking_started(tracking_number: &TrackingNumber) -> String {
    format!(
        "
📦 <b>New Tracking Started</b>

Tracking Number: <code>{}</code>

Your package is now being tracked. You will receive updates about your package's status.

{FOOTER}
",
        escape_html(tracking_number.as_str())
    )
}

/// One status block. The footer is only wanted on the last block of a listing.
pub fn status_block(
    tracking_number: &TrackingNumber,
    status: &Status,
    detail: &str,
    last_updated: DateTime<Utc>,
    include_footer: bool,
) -> String {
    let mut out = format!(
        "
📦 <b>Package Status Update</b>

Tracking Number: <code>{}</code>
Status: {} <b>{}</b>
Time: {}

{}",
        escape_html(tracking_number.as_str()),
        status.emoji(),
        escape_html(status.label()),
        human_timestamp(last_updated),
        escape_html(detail),
    );

    if include_footer {
        out.push_str("\n\n");
        out.push_str(FOOTER);
    }

    out
}

/// Combined `/status` reply; `records` must already be ordered most recent first.
pub fn status_listing(records: &[TrackingRecord]) -> String {
    let mut out = STATUS_LISTING_HEADER.to_string();
    let last = records.len().saturating_sub(1);
    for (idx, r) in records.iter().enumerate() {
        out.push_str(&status_block(
            &r.tracking_number,
            &r.status,
            &r.status_detail,
            r.last_updated,
            idx == last,
        ));
    }
    out
}
