//! Prints the MySQL CustomResourceDefinition as YAML
//!
//! Usage: `cargo run --bin crdgen | kubectl apply -f -`

use kube::CustomResourceExt;
use mysql_api::MySQL;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&MySQL::crd())?);
    Ok(())
}
