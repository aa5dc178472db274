//! Keyed upserts.
//!
//! Env vars are keyed by name, volume mounts by mount path and volumes by name.
//! An existing entry is replaced in place, a new one is appended; order of the
//! untouched entries is preserved.

use k8s_openapi::api::core::v1::{EnvVar, Volume, VolumeMount};

pub fn upsert_env_vars(
    mut existing: Vec<EnvVar>,
    vars: impl IntoIterator<Item = EnvVar>,
) -> Vec<EnvVar> {
    for var in vars {
        match existing.iter_mut().find(|e| e.name == var.name) {
            Some(slot) => *slot = var,
            None => existing.push(var),
        }
    }
    existing
}

pub fn upsert_volume_mount_by_path(
    mut existing: Vec<VolumeMount>,
    mount: VolumeMount,
) -> Vec<VolumeMount> {
    match existing.iter_mut().find(|m| m.mount_path == mount.mount_path) {
        Some(slot) => *slot = mount,
        None => existing.push(mount),
    }
    existing
}

pub fn upsert_volume(mut existing: Vec<Volume>, volume: Volume) -> Vec<Volume> {
    match existing.iter_mut().find(|v| v.name == volume.name) {
        Some(slot) => *slot = volume,
        None => existing.push(volume),
    }
    existing
}
