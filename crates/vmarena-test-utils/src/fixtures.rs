//! Arena configurations shared by scenario tests.

use vmarena_core::{kib, mib, ArenaConfig};

/// 1 MiB reserve, 64 KiB commit steps: the growth scenario where a
/// 100 000-byte push commits up to 128 KiB and a 2 000 000-byte push
/// exceeds the reservation.
pub fn growth_scenario_config() -> ArenaConfig {
    ArenaConfig::new(mib(1), kib(64))
}

/// The smallest useful arena: everything rounds up to one commit step of
/// 64 KiB inside a 256 KiB reservation.
pub fn tiny_config() -> ArenaConfig {
    ArenaConfig::new(kib(256), kib(64))
}
