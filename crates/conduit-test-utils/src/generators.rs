//! Ad hoc random-data generators, for tests that want a plausible random
//! value without full proptest shrinking (see [`crate::proptest_strategies`]
//! for that).

use rand::Rng;

use conduit_core::{EndPointAddress, ModuleIdentifier, ModuleVersion, Route};

/// A random module identifier, e.g. `module-417`.
#[must_use]
pub fn random_module_identifier() -> ModuleIdentifier {
    let mut rng = rand::thread_rng();
    let prefixes = ["payments", "billing", "catalog", "search", "accounts", "shipping"];
    let prefix = prefixes[rng.gen_range(0..prefixes.len())];
    ModuleIdentifier::new(format!("{prefix}-{}", rng.gen_range(1..1000))).expect("generated name is non-empty")
}

/// A random release version, biased toward small major/minor numbers the
/// way real module catalogs look.
#[must_use]
pub fn random_version() -> ModuleVersion {
    let mut rng = rand::thread_rng();
    ModuleVersion::new(rng.gen_range(0..5), rng.gen_range(0..20), rng.gen_range(0..50))
}

/// A random dotted route, e.g. `Orders.Placed`.
#[must_use]
pub fn random_route() -> Route {
    let mut rng = rand::thread_rng();
    let aggregates = ["Orders", "Payments", "Shipments", "Accounts"];
    let events = ["Created", "Placed", "Cancelled", "Updated", "Removed"];
    Route::from(format!(
        "{}.{}",
        aggregates[rng.gen_range(0..aggregates.len())],
        events[rng.gen_range(0..events.len())]
    ))
}

/// A random endpoint address built from random bytes, distinct from
/// [`EndPointAddress::unknown`].
#[must_use]
pub fn random_endpoint_address() -> EndPointAddress {
    let mut rng = rand::thread_rng();
    let len = rng.gen_range(4..16);
    let bytes: Vec<u8> = (0..len).map(|_| rng.gen_range(b'a'..=b'z')).collect();
    EndPointAddress::from(String::from_utf8(bytes).expect("ascii lowercase is valid utf8"))
}
