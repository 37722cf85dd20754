// Copyright (C) 2025 LES e.V.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Team identifier lookup.
//!
//! The set of teams is fixed per deployment; the mapping is baked in at
//! compile time and never mutated at runtime.

/// Resolve a team identifier to its display name, as rendered into the
/// PDF template. Returns `None` for unknown identifiers.
pub fn display_name(team_id: &str) -> Option<&'static str> {
    match team_id {
        "team-esm" => Some("E-Sport-Management"),
        "team-hs" => Some("Hochschulen"),
        "team-oea" => Some("Öffentlichkeitsarbeit"),
        "team-tech" => Some("Technik"),
        "team-vs" => Some("Veranstaltungen"),
        "team-vh" => Some("Vereinsheim"),
        _ => None,
    }
}
