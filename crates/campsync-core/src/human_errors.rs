// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Staff-facing error messages.
//
// Counsellors at the check-in desk are not engineers. Every error is mapped
// to plain English with a next step. The taxonomy's severity drives the
// colour and icon of the alert in the app.

use crate::error::CampSyncError;

/// Severity of an error from the staff member's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Tag slipped away or the phone was busy. Tapping again usually works.
    Transient,
    /// Staff must do something (fix the code, swap the band, call the office).
    ActionRequired,
    /// Cannot be fixed by retrying on this device.
    Permanent,
}

/// A human-readable error with a plain English message and a next step.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short summary (shown as a heading).
    pub message: String,
    /// What to try next (shown as body text).
    pub suggestion: String,
    /// Whether tapping the band again is a sensible retry.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `CampSyncError` into a `HumanError` for the check-in desk.
pub fn humanize_error(err: &CampSyncError) -> HumanError {
    match err {
        CampSyncError::Validation(detail) if detail.starts_with("lock code") => HumanError {
            message: "That lock code can't be used.".into(),
            suggestion: format!("Lock codes are 8 to 32 letters, numbers or symbols, with no spaces. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        CampSyncError::Validation(detail) => HumanError {
            message: "That input can't be used.".into(),
            suggestion: format!("Check the value and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        CampSyncError::Persistence(_) | CampSyncError::Database(_) => HumanError {
            message: "The setting couldn't be saved.".into(),
            suggestion: "The previous lock code is still active. Check the connection and try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        CampSyncError::SizeExceeded { actual, limit } => HumanError {
            message: "This camper's details don't fit on a wristband.".into(),
            suggestion: format!(
                "Shorten the allergy or medication entries and try again. Nothing was written. ({actual} of {limit} characters)"
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        CampSyncError::Integrity(_) => HumanError {
            message: "This wristband can't be trusted.".into(),
            suggestion: "It may be damaged, from another camp, or written with an old lock code. Replace the band and program it again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        CampSyncError::Format(_) => HumanError {
            message: "The wristband data is unreadable.".into(),
            suggestion: "Erase the band and program it again from the camper's record.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        CampSyncError::Driver(detail) => humanize_driver_error(detail),

        CampSyncError::SessionBusy => HumanError {
            message: "Another wristband is still being processed.".into(),
            suggestion: "Wait for the current tap to finish, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        CampSyncError::PlatformUnavailable => HumanError {
            message: "This device can't read wristbands.".into(),
            suggestion: "Use a phone or tablet with NFC turned on.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        CampSyncError::CheckInNotRecorded { wristband_id, .. } => HumanError {
            message: "The wristband was written, but the check-in wasn't saved.".into(),
            suggestion: format!(
                "The camper has a working band ({wristband_id}). Don't program a new one: mark them checked in from the camper list or tell the office."
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        CampSyncError::Io(_) | CampSyncError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

/// Driver messages come from the platform NFC stack; pick out the common ones.
fn humanize_driver_error(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("lost") || lower.contains("timed out") || lower.contains("timeout") {
        HumanError {
            message: "The wristband moved away too soon.".into(),
            suggestion: "Hold the band flat against the back of the phone until it vibrates. Nothing was changed.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("cancel") {
        HumanError {
            message: "The scan was cancelled.".into(),
            suggestion: "Tap the band again when you're ready.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("capacity") || lower.contains("read-only") || lower.contains("protected") {
        HumanError {
            message: "This wristband can't be written.".into(),
            suggestion: "It may be locked with a different lock code or too small. Use a new band.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "The wristband couldn't be read or written.".into(),
            suggestion: format!("Nothing was changed. Try again. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}
