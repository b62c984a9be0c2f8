use conduit_core::Error;

/// Broadcast when a resolution run produced no viable installation set.
/// Downstream supervisors (the module lifecycle model, the host runtime)
/// react to this rather than to the bare error, since it is a notification
/// that fans out to multiple listeners, not a single call's return path.
#[derive(Debug, Clone)]
pub struct InstallationSetConflict {
    pub explanation: String,
}

impl InstallationSetConflict {
    /// Build the event from the error `resolve` returns, if it is the
    /// version-conflict variant. Any other error is a propagated oracle
    /// failure and is not an installation-set conflict.
    #[must_use]
    pub fn from_resolve_error(error: &Error) -> Option<Self> {
        match error {
            Error::VersionConflict { explanation } => Some(Self {
                explanation: explanation.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_version_conflict_only() {
        let conflict = Error::VersionConflict {
            explanation: "no viable set".into(),
        };
        assert!(InstallationSetConflict::from_resolve_error(&conflict).is_some());

        let other = Error::Cancelled;
        assert!(InstallationSetConflict::from_resolve_error(&other).is_none());
    }
}
