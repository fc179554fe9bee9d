//! Ordered probe registry holding per-probe migration flags.
//!
//! Probes are registered at startup. The only runtime mutation is the
//! operator flipping migration flags (or deregistering a probe that was
//! moved to out-of-band alerting), so a `RwLock` around a `Vec` is enough.
//! Readers take a snapshot and never hold the lock across an await.

use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use regex::Regex;
use tracing::{info, warn};

use super::{CheckKind, Classification, Probe, RegistryError};

static NAME_REGEX: OnceLock<Regex> = OnceLock::new();

fn name_regex() -> &'static Regex {
    NAME_REGEX.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_.-]*$").expect("Invalid regex"))
}

struct Entry {
    probe: Arc<Probe>,
    migrated: bool,
}

/// A probe plus its migration flag at the time of the snapshot.
#[derive(Clone, Debug)]
pub struct RegisteredProbe {
    pub probe: Arc<Probe>,
    pub migrated: bool,
}

/// Process-wide probe registry. Construct once, share via `Arc`.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<Vec<Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Entry>> {
        // Entries are plain data; a panicked writer cannot leave them torn.
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Entry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a probe, not yet migrated.
    pub fn register(&self, probe: Probe) -> Result<(), RegistryError> {
        self.register_with_flag(probe, false)
    }

    /// Register a probe with an explicit initial migration flag.
    pub fn register_with_flag(&self, probe: Probe, migrated: bool) -> Result<(), RegistryError> {
        if !name_regex().is_match(probe.name()) {
            return Err(RegistryError::InvalidName {
                name: probe.name().to_string(),
            });
        }

        let mut entries = self.write();
        if entries
            .iter()
            .any(|e| e.probe.kind() == probe.kind() && e.probe.name() == probe.name())
        {
            return Err(RegistryError::DuplicateName {
                name: probe.name().to_string(),
                kind: probe.kind(),
            });
        }

        if probe.kind() == CheckKind::Liveness {
            warn!(
                probe = probe.name(),
                "Liveness probe registered; /healthcheck never runs dependency probes"
            );
        }

        info!(
            probe = probe.name(),
            kind = %probe.kind(),
            classification = %probe.classification(),
            migrated,
            "Probe registered"
        );

        entries.push(Entry {
            probe: Arc::new(probe),
            migrated,
        });
        Ok(())
    }

    /// Remove a probe (e.g. after converting it to an out-of-band alert).
    pub fn deregister(&self, name: &str, kind: CheckKind) -> Result<(), RegistryError> {
        let mut entries = self.write();
        let pos = entries
            .iter()
            .position(|e| e.probe.kind() == kind && e.probe.name() == name)
            .ok_or_else(|| RegistryError::UnknownProbe {
                name: name.to_string(),
                kind,
            })?;

        entries.remove(pos);
        info!(probe = name, kind = %kind, "Probe deregistered");
        Ok(())
    }

    /// Snapshot of probes for a kind, in registration order.
    pub fn probes_for(&self, kind: CheckKind) -> Vec<RegisteredProbe> {
        self.read()
            .iter()
            .filter(|e| e.probe.kind() == kind)
            .map(|e| RegisteredProbe {
                probe: Arc::clone(&e.probe),
                migrated: e.migrated,
            })
            .collect()
    }

    /// Snapshot of every probe, all kinds, in registration order.
    pub fn all(&self) -> Vec<RegisteredProbe> {
        self.read()
            .iter()
            .map(|e| RegisteredProbe {
                probe: Arc::clone(&e.probe),
                migrated: e.migrated,
            })
            .collect()
    }

    /// Flip a probe's migration flag. Returns the previous value.
    ///
    /// Takes effect for the next aggregation run; runs already in flight
    /// keep the flag they started with.
    pub fn set_migrated(
        &self,
        name: &str,
        kind: CheckKind,
        migrated: bool,
    ) -> Result<bool, RegistryError> {
        let mut entries = self.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.probe.kind() == kind && e.probe.name() == name)
            .ok_or_else(|| RegistryError::UnknownProbe {
                name: name.to_string(),
                kind,
            })?;

        let previous = std::mem::replace(&mut entry.migrated, migrated);

        if entry.probe.classification() == Classification::Informational {
            warn!(
                probe = name,
                kind = %kind,
                "Migration flag set on informational probe; it will not affect readiness"
            );
        }

        info!(
            probe = name,
            kind = %kind,
            previous,
            migrated,
            "Migration flag updated"
        );
        Ok(previous)
    }

    /// Current migration flag, if the probe exists.
    pub fn is_migrated(&self, name: &str, kind: CheckKind) -> Option<bool> {
        self.read()
            .iter()
            .find(|e| e.probe.kind() == kind && e.probe.name() == name)
            .map(|e| e.migrated)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
