//! Module version identity and range arithmetic.
//!
//! A [`ModuleVersion`] is the `(major, minor, revision, isPreRelease)` tuple
//! described by the module data model. Ordering is lexicographic on
//! `(major, minor, revision)`, with a release ranking strictly above a
//! pre-release of the same triple.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single module version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleVersion {
    pub major: u32,
    pub minor: u32,
    pub revision: u32,
    pub is_pre_release: bool,
}

impl ModuleVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            revision,
            is_pre_release: false,
        }
    }

    #[must_use]
    pub const fn pre_release(major: u32, minor: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            revision,
            is_pre_release: true,
        }
    }

    const fn triple(self) -> (u32, u32, u32) {
        (self.major, self.minor, self.revision)
    }
}

impl Ord for ModuleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple()
            .cmp(&other.triple())
            // a release outranks a pre-release of the same (major, minor, revision)
            .then_with(|| (!self.is_pre_release).cmp(&(!other.is_pre_release)))
    }
}

impl PartialOrd for ModuleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)?;
        if self.is_pre_release {
            write!(f, "-pre")?;
        }
        Ok(())
    }
}

/// The upper bound of a [`ModuleVersionRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpperBound {
    /// No upper bound.
    Unbounded,
    /// `<= version`.
    Inclusive(ModuleVersion),
    /// `< version`.
    Exclusive(ModuleVersion),
}

/// Raised when two ranges share no versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("incompatible version ranges")]
pub struct Incompatible;

/// An inclusive-lower, inclusive-or-open-upper version range.
///
/// `single_version` ranges match exactly one version regardless of the
/// pre-release flag (they are how installed modules are seeded into the
/// resolver: see [`crate::error`] and the resolver crate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleVersionRange {
    pub lower: ModuleVersion,
    pub upper: UpperBound,
    /// Whether pre-release versions are accepted by this range.
    pub allow_pre_release: bool,
    /// If set, the range matches exactly this one version.
    pub single_version: Option<ModuleVersion>,
}

impl ModuleVersionRange {
    /// A range accepting any release version `>= 0.0.0`.
    #[must_use]
    pub const fn any() -> Self {
        Self {
            lower: ModuleVersion::new(0, 0, 0),
            upper: UpperBound::Unbounded,
            allow_pre_release: false,
            single_version: None,
        }
    }

    /// A range that matches only `version`, as used to seed installed
    /// modules into an [`crate::UnresolvedInstallationSet`]-style search.
    #[must_use]
    pub fn exact(version: ModuleVersion) -> Self {
        Self {
            lower: version,
            upper: UpperBound::Inclusive(version),
            allow_pre_release: version.is_pre_release,
            single_version: Some(version),
        }
    }

    #[must_use]
    pub fn new(lower: ModuleVersion, upper: UpperBound, allow_pre_release: bool) -> Self {
        Self {
            lower,
            upper,
            allow_pre_release,
            single_version: None,
        }
    }

    /// Whether `version` falls within this range.
    #[must_use]
    pub fn matches(&self, version: ModuleVersion) -> bool {
        if let Some(exact) = self.single_version {
            return version == exact;
        }
        if version.is_pre_release && !self.allow_pre_release {
            return false;
        }
        if version < self.lower {
            return false;
        }
        match self.upper {
            UpperBound::Unbounded => true,
            UpperBound::Inclusive(max) => version <= max,
            UpperBound::Exclusive(max) => version < max,
        }
    }

    /// Intersect two ranges, failing if the result is provably empty.
    ///
    /// Commutative and associative: the result depends only on the set of
    /// versions each range admits, not on argument order.
    pub fn combine(&self, other: &Self) -> Result<Self, Incompatible> {
        if let (Some(a), Some(b)) = (self.single_version, other.single_version) {
            return if a == b { Ok(*self) } else { Err(Incompatible) };
        }
        if let Some(exact) = self.single_version.or(other.single_version) {
            let against = if self.single_version.is_some() {
                other
            } else {
                self
            };
            return if against.matches(exact) {
                Ok(Self::exact(exact))
            } else {
                Err(Incompatible)
            };
        }

        let lower = self.lower.max(other.lower);
        let upper = match (self.upper, other.upper) {
            (UpperBound::Unbounded, b) => b,
            (a, UpperBound::Unbounded) => a,
            (UpperBound::Inclusive(a), UpperBound::Inclusive(b)) => {
                if a <= b {
                    UpperBound::Inclusive(a)
                } else {
                    UpperBound::Inclusive(b)
                }
            }
            (UpperBound::Exclusive(a), UpperBound::Exclusive(b)) => {
                if a <= b {
                    UpperBound::Exclusive(a)
                } else {
                    UpperBound::Exclusive(b)
                }
            }
            (UpperBound::Inclusive(a), UpperBound::Exclusive(b))
            | (UpperBound::Exclusive(b), UpperBound::Inclusive(a)) => {
                if a < b {
                    UpperBound::Inclusive(a)
                } else {
                    UpperBound::Exclusive(b)
                }
            }
        };

        let combined = Self {
            lower,
            upper,
            allow_pre_release: self.allow_pre_release && other.allow_pre_release,
            single_version: None,
        };

        // Reject an empty intersection outright so callers never have to
        // special-case a range that can never be satisfied.
        let non_empty = match combined.upper {
            UpperBound::Unbounded => true,
            UpperBound::Inclusive(max) => combined.lower <= max,
            UpperBound::Exclusive(max) => combined.lower < max,
        };

        if non_empty {
            Ok(combined)
        } else {
            Err(Incompatible)
        }
    }
}

impl fmt::Display for ModuleVersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = self.single_version {
            return write!(f, "={v}");
        }
        write!(f, ">={}", self.lower)?;
        match self.upper {
            UpperBound::Unbounded => {}
            UpperBound::Inclusive(v) => write!(f, " <={v}")?,
            UpperBound::Exclusive(v) => write!(f, " <{v}")?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_outranks_pre_release_at_same_triple() {
        let release = ModuleVersion::new(1, 0, 0);
        let pre = ModuleVersion::pre_release(1, 0, 0);
        assert!(release > pre);
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(ModuleVersion::new(1, 2, 0) > ModuleVersion::new(1, 1, 9));
        assert!(ModuleVersion::new(2, 0, 0) > ModuleVersion::new(1, 99, 99));
    }

    #[test]
    fn combine_intersects_bounds() {
        let a = ModuleVersionRange::new(
            ModuleVersion::new(1, 0, 0),
            UpperBound::Exclusive(ModuleVersion::new(2, 0, 0)),
            false,
        );
        let b = ModuleVersionRange::new(
            ModuleVersion::new(1, 5, 0),
            UpperBound::Exclusive(ModuleVersion::new(3, 0, 0)),
            false,
        );
        let combined = a.combine(&b).unwrap();
        assert_eq!(combined.lower, ModuleVersion::new(1, 5, 0));
        assert_eq!(
            combined.upper,
            UpperBound::Exclusive(ModuleVersion::new(2, 0, 0))
        );
    }

    #[test]
    fn combine_commutative() {
        let a = ModuleVersionRange::new(
            ModuleVersion::new(1, 0, 0),
            UpperBound::Exclusive(ModuleVersion::new(2, 0, 0)),
            false,
        );
        let b = ModuleVersionRange::new(
            ModuleVersion::new(1, 5, 0),
            UpperBound::Unbounded,
            false,
        );
        assert_eq!(a.combine(&b).ok(), b.combine(&a).ok());
    }

    #[test]
    fn combine_rejects_empty_intersection() {
        let a = ModuleVersionRange::new(
            ModuleVersion::new(1, 0, 0),
            UpperBound::Exclusive(ModuleVersion::new(2, 0, 0)),
            false,
        );
        let b = ModuleVersionRange::new(
            ModuleVersion::new(3, 0, 0),
            UpperBound::Unbounded,
            false,
        );
        assert!(a.combine(&b).is_err());
    }

    #[test]
    fn matches_agrees_with_combine() {
        let a = ModuleVersionRange::new(
            ModuleVersion::new(1, 0, 0),
            UpperBound::Exclusive(ModuleVersion::new(2, 0, 0)),
            false,
        );
        let b = ModuleVersionRange::new(
            ModuleVersion::new(1, 2, 0),
            UpperBound::Exclusive(ModuleVersion::new(1, 8, 0)),
            false,
        );
        let combined = a.combine(&b).unwrap();
        for v in [
            ModuleVersion::new(1, 1, 0),
            ModuleVersion::new(1, 3, 0),
            ModuleVersion::new(1, 9, 0),
        ] {
            assert_eq!(combined.matches(v), a.matches(v) && b.matches(v));
        }
    }

    #[test]
    fn single_version_mode_ignores_bounds() {
        let exact = ModuleVersionRange::exact(ModuleVersion::new(1, 0, 0));
        assert!(exact.matches(ModuleVersion::new(1, 0, 0)));
        assert!(!exact.matches(ModuleVersion::new(1, 0, 1)));
    }
}
