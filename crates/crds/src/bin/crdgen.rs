//! Prints the Server CRD manifest as YAML.
//!
//! Usage: `cargo run --bin crdgen > config/crd/server.yaml`

use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&crds::Server::crd())?);
    Ok(())
}
