// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: wires the wristband crates to on-disk state so the CLI
// commands stay one-liners.

pub mod app_services;
pub mod data_dir;
pub mod roster;
