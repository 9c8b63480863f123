//! Boundary seam for mDNS advertisement of `_echo-mesh._tcp`. Implementing
//! real mDNS is out of scope for the coordinator core (spec §6); this trait
//! gives `main` a place to plug in a real implementation (e.g. `mdns-sd`,
//! unused anywhere in this workspace) without fabricating one here.

pub trait DiscoveryHandle: Send + Sync {
    fn advertise(&self, service: &str, port: u16);
}

pub struct NullDiscovery;

impl DiscoveryHandle for NullDiscovery {
    fn advertise(&self, service: &str, port: u16) {
        tracing::info!(
            service,
            port,
            "mDNS advertisement not implemented; workers must be configured with an explicit coordinator URL"
        );
    }
}
