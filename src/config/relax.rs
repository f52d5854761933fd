//! Derived gateway fields.
//!
//! The gateway declares its peer IP, trusted dispatch URL and signing key as
//! required. Running next to the dispatch API all three have a fallback
//! computed by [`crate::config::reconcile`], so the composite command clears
//! the requirement for exactly the fields listed in [`DERIVED_FIELDS`].

/// Where a derived gateway field takes its value from when left unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackSource {
    /// Host portion of the dispatch peer URL.
    DispatchPeerHost,
    /// The dispatch peer URL itself.
    DispatchPeerUrl,
    /// The dispatch session signing key path.
    DispatchSessionSigningKey,
}

/// A gateway flag that becomes optional because it has a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedField {
    /// Flag id, identical to its long name.
    pub flag: &'static str,
    pub source: FallbackSource,
}

/// Resolved by [`crate::config::reconcile`] in this order.
pub const DERIVED_FIELDS: &[DerivedField] = &[
    DerivedField {
        flag: "gateway-dispatch-url",
        source: FallbackSource::DispatchPeerUrl,
    },
    DerivedField {
        flag: "gateway-session-signing-key",
        source: FallbackSource::DispatchSessionSigningKey,
    },
    DerivedField {
        flag: "gateway-peer-ip",
        source: FallbackSource::DispatchPeerHost,
    },
];

/// Clear the `required` attribute of every flag in [`DERIVED_FIELDS`].
///
/// Panics if a listed flag is not declared on `command`.
pub fn relax_requirements(command: clap::Command) -> clap::Command {
    DERIVED_FIELDS.iter().fold(command, |command, field| {
        command.mut_arg(field.flag, |arg| arg.required(false))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebCommand;
    use clap::{CommandFactory, Parser};

    const DISPATCH_ONLY: [&str; 5] = [
        "web",
        "--peer-url",
        "https://dispatch.example.com:8080/",
        "--session-signing-key",
        "/etc/web/session_signing_key",
    ];

    #[test]
    fn test_exactly_three_fields_are_derived() {
        assert_eq!(DERIVED_FIELDS.len(), 3);
        let command = WebCommand::command();
        for field in DERIVED_FIELDS {
            let arg = command
                .get_arguments()
                .find(|a| a.get_id() == field.flag)
                .unwrap();
            assert!(arg.is_required_set(), "{} should be required standalone", field.flag);
        }
    }

    #[test]
    fn test_relaxed_fields_not_required() {
        let command = WebCommand::relaxed_command();
        for field in DERIVED_FIELDS {
            let arg = command
                .get_arguments()
                .find(|a| a.get_id() == field.flag)
                .unwrap();
            assert!(!arg.is_required_set());
        }
    }

    #[test]
    fn test_other_requirements_untouched() {
        let command = WebCommand::relaxed_command();
        let required: Vec<_> = command
            .get_arguments()
            .filter(|a| a.is_required_set())
            .map(|a| a.get_id().to_string())
            .collect();
        assert!(required.contains(&"peer_url".to_string()));
        assert!(required.contains(&"session_signing_key".to_string()));
    }

    #[test]
    fn test_strict_command_rejects_dispatch_only_args() {
        assert!(WebCommand::try_parse_from(DISPATCH_ONLY).is_err());
        assert!(WebCommand::try_parse_relaxed_from(DISPATCH_ONLY).is_ok());
    }

    #[test]
    #[should_panic]
    fn test_unknown_flag_is_a_programming_error() {
        let _ = clap::Command::new("empty").mut_arg("gateway-peer-ip", |arg| arg.required(false));
    }
}
