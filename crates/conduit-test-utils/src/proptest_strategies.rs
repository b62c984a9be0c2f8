//! Proptest strategies for the core version, address, and route types —
//! used by the invariant properties in spec §8 (combine commutativity,
//! address equality, framing round-trips).

use proptest::prelude::*;

use conduit_core::{EndPointAddress, ModuleVersion, ModuleVersionRange, Route, UpperBound};

/// Strategy for a [`ModuleVersion`], occasionally a pre-release.
pub fn module_version_strategy() -> impl Strategy<Value = ModuleVersion> {
    (0u32..10, 0u32..20, 0u32..50, any::<bool>()).prop_map(|(major, minor, revision, pre)| {
        if pre {
            ModuleVersion::pre_release(major, minor, revision)
        } else {
            ModuleVersion::new(major, minor, revision)
        }
    })
}

/// Strategy for a non-`single_version` [`ModuleVersionRange`] with a
/// lower bound and either an unbounded, inclusive, or exclusive upper one.
pub fn module_version_range_strategy() -> impl Strategy<Value = ModuleVersionRange> {
    (module_version_strategy(), 0u8..3, module_version_strategy(), any::<bool>()).prop_map(|(lower, upper_kind, upper_value, allow_pre)| {
        let upper = match upper_kind {
            0 => UpperBound::Unbounded,
            1 => UpperBound::Inclusive(upper_value),
            _ => UpperBound::Exclusive(upper_value),
        };
        ModuleVersionRange::new(lower, upper, allow_pre)
    })
}

/// Strategy for a non-empty [`EndPointAddress`] built from printable ASCII.
pub fn endpoint_address_strategy() -> impl Strategy<Value = EndPointAddress> {
    "[a-zA-Z0-9][a-zA-Z0-9_-]{0,31}".prop_map(|s| EndPointAddress::from(s.as_str()))
}

/// Strategy for a dotted route string, e.g. `Orders.Placed`.
pub fn route_strategy() -> impl Strategy<Value = Route> {
    ("[A-Z][a-zA-Z]{2,16}", "[A-Z][a-zA-Z]{2,16}").prop_map(|(aggregate, event)| Route::from(format!("{aggregate}.{event}")))
}

/// Strategy for an arbitrary frame payload.
pub fn frame_payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..64)
}
