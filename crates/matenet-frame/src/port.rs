//! Hub port addresses.
//!
//! Port 0 is the root: the device wired directly to the controller, or the
//! hub itself. A hub fans out to ports 1-10.

/// The root port.
pub const ROOT_PORT: u8 = 0;

/// Highest port a hub exposes.
pub const MAX_HUB_PORT: u8 = 10;

/// Returns a human-readable name for a port.
pub fn port_name(port: u8) -> &'static str {
    match port {
        ROOT_PORT => "ROOT",
        1..=MAX_HUB_PORT => "HUB",
        _ => "INVALID",
    }
}

/// Returns true if the port is addressable through a hub.
pub fn is_hub_port(port: u8) -> bool {
    (1..=MAX_HUB_PORT).contains(&port)
}

/// Returns true for any port a controller may address.
pub fn is_valid_port(port: u8) -> bool {
    port <= MAX_HUB_PORT
}
