// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CampSync: wristband tag sessions.
//
// `WristbandStation` owns the one NFC transceiver and runs program / read /
// erase as single sessions. `CheckInDesk` layers the camper lookup and the
// check-in record on top of a station.

pub mod best_effort;
pub mod checkin;
pub mod password;
pub mod station;

pub use checkin::{CamperDirectory, CheckInDesk, CheckInOutcome};
pub use password::TagPassword;
pub use station::WristbandStation;
