//! # Desired-State Synthesizer
//!
//! Pure builder functions turning an [`EffectiveSpec`](super::resolver::EffectiveSpec)
//! into pod templates. Every helper returns a new value; nothing here mutates
//! shared state or talks to the cluster.
//!
//! - `env.rs` - keyed upserts for env vars, volume mounts and volumes
//! - `volumes.rs` - code and media volumes and their mounts
//! - `containers.rs` - primary, init and sidecar containers
//! - `pod.rs` - web and job pod templates

mod containers;
mod env;
mod pod;
mod volumes;

pub use containers::{init_containers, media_containers, wordpress_env, wordpress_env_from};
pub use env::{upsert_env_vars, upsert_volume, upsert_volume_mount_by_path};
pub use pod::{job_pod_template, web_pod_template};
pub use volumes::{code_volume, media_volume, volume_mounts, volumes};
