// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CampSync: NFC bridge.
//
// Defines the driver trait the host platform implements, the NDEF and
// NTAG215 wire details shared by every driver, a simulated tag used on
// desktop and in tests, and a stub for hosts with no reader.

pub mod ndef;
pub mod ntag;
pub mod simulated;
pub mod stub;
pub mod traits;

pub use simulated::{SimOp, SimulatedTag};
pub use stub::StubNfcDriver;
pub use traits::NfcDriver;
