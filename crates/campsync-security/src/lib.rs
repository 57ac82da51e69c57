// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// campsync-security: keyed integrity prefix for wristband payloads and the
// lock-code store that supplies the shared secret.

pub mod integrity;
pub mod lock_code;
pub mod settings;

pub use integrity::{unwrap, wrap};
pub use lock_code::{LockCodeStore, SettingsStore};
pub use settings::SqliteSettingsStore;
