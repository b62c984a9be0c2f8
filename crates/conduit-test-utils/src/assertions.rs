//! Domain-specific assertion helpers for resolver and dispatch results.

use conduit_core::{ModuleIdentifier, ModuleVersion};
use conduit_message::Message;
use conduit_resolver::ResolvedInstallationSet;

/// Assert that `set` pins `module` to exactly `version`.
pub fn assert_resolved_at(set: &ResolvedInstallationSet, module: &str, version: ModuleVersion) {
    let id = ModuleIdentifier::new(module).expect("assertion module name is non-empty");
    match set.get(&id) {
        Some(actual) => assert_eq!(actual, version, "expected {module} pinned to {version}, found {actual}"),
        None => panic!("expected {module} to be present in the resolved set, but it was absent"),
    }
}

/// Assert that `set` contains exactly the given `(module, version)` pairs,
/// independent of iteration order.
pub fn assert_resolved_exactly(set: &ResolvedInstallationSet, expected: &[(&str, ModuleVersion)]) {
    assert_eq!(set.len(), expected.len(), "resolved set has a different number of modules than expected");
    for (module, version) in expected {
        assert_resolved_at(set, module, *version);
    }
}

/// Assert that `message`'s top frame holds exactly `payload`.
pub fn assert_top_frame(message: &Message, payload: &[u8]) {
    match message.top_frame() {
        Some(frame) => assert_eq!(frame.as_ref(), payload, "top frame payload mismatch"),
        None => panic!("expected a top frame carrying {payload:?}, message had none"),
    }
}
