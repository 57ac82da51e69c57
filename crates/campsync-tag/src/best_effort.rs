// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Best-effort tag steps.
//
// Password set/unlock/clear ride on raw transceive commands that many
// wristbands do not support. Their driver failures are logged and dropped;
// anything else (a codec bug, a busy session) still propagates.

use std::future::Future;

use campsync_core::error::Result;
use tracing::warn;

/// Run `step`. Driver errors become `Ok(None)`; other errors propagate.
pub async fn best_effort<T>(
    name: &'static str,
    step: impl Future<Output = Result<T>>,
) -> Result<Option<T>> {
    match step.await {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_driver() => {
            warn!(step = name, error = %e, "best-effort tag step failed, continuing");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
