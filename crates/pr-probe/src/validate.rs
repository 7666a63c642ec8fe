//! Structural validation gate between parsing and probing.

use std::collections::HashMap;

use pr_link::model::Profile;

use crate::engine::ProxyEngine;

/// Profiles that passed the gate, plus the error-frequency map for the ones
/// that did not (message -> occurrence count, reporting only).
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    pub profiles: Vec<Profile>,
    pub errors: HashMap<String, usize>,
}

/// Ask the engine to confirm each descriptor is constructible, keep the
/// survivors, and tag them `outbound-<index>`.
///
/// This is a pure gate: no network I/O happens here. Tags are assigned only
/// after the filtered list is final, so indices are stable for the whole
/// probing phase.
pub fn validate_and_tag(engine: &dyn ProxyEngine, profiles: Vec<Profile>) -> ValidationOutcome {
    let mut kept = Vec::with_capacity(profiles.len());
    let mut errors: HashMap<String, usize> = HashMap::new();

    for profile in profiles {
        match engine.validate(&profile.descriptor) {
            Ok(()) => kept.push(profile),
            Err(e) => {
                let key = format!("{}: {}", profile.descriptor.protocol(), e);
                *errors.entry(key).or_insert(0) += 1;
            }
        }
    }

    for (index, profile) in kept.iter_mut().enumerate() {
        profile.tag = Some(format!("outbound-{index}"));
    }

    ValidationOutcome {
        profiles: kept,
        errors,
    }
}
