//! # CRD Generator
//!
//! Prints the `Wordpress` and `WordpressRuntime` CustomResourceDefinitions as
//! one multi-document YAML stream.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/wordpress.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use anyhow::{Context, Result};
use kube::core::CustomResourceExt;
use wordpress_operator::crd::{Wordpress, WordpressRuntime};

fn main() -> Result<()> {
    let documents = [
        serde_yaml::to_string(&Wordpress::crd()).context("Failed to serialize Wordpress CRD")?,
        serde_yaml::to_string(&WordpressRuntime::crd())
            .context("Failed to serialize WordpressRuntime CRD")?,
    ];
    for document in documents {
        println!("---");
        print!("{document}");
    }
    Ok(())
}
