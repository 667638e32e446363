// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for lifecycle error types.

#[cfg(test)]
mod tests {
    use crate::errors::*;
    use kube::core::Status;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(
            Status::failure(&format!("HTTP {code}"), "Test")
                .with_code(code)
                .boxed(),
        )
    }

    #[test]
    fn test_not_ready_error_message() {
        let error = LifecycleError::NotReady {
            namespace: "platform".to_string(),
            name: "ingress".to_string(),
        };

        assert_eq!(error.to_string(), "Module platform/ingress is not ready yet");
        assert!(error.is_not_ready());
        assert!(!error.is_conflict());
        assert!(!error.is_configuration());
        assert_eq!(error.kind(), "not_ready");
    }

    #[test]
    fn test_conflict_error_message() {
        let error = LifecycleError::Conflict {
            namespace: "platform".to_string(),
            name: "ingress".to_string(),
            what: "status",
        };

        assert_eq!(
            error.to_string(),
            "Conflict writing status for platform/ingress: resource was modified concurrently"
        );
        assert!(error.is_conflict());
    }

    #[test]
    fn test_kube_409_counts_as_conflict() {
        let error = LifecycleError::from(api_error(409));
        assert!(error.is_conflict());
        assert_eq!(error.kind(), "kube_api");

        let error = LifecycleError::from(api_error(500));
        assert!(!error.is_conflict());
    }

    #[test]
    fn test_configuration_errors() {
        let no_installer = LifecycleError::NoInstaller {
            namespace: "platform".to_string(),
            name: "ingress".to_string(),
        };
        let unimplemented = LifecycleError::UnimplementedInstaller {
            namespace: "platform".to_string(),
            name: "mesh".to_string(),
            kind: "istio".to_string(),
        };

        assert!(no_installer.is_configuration());
        assert!(unimplemented.is_configuration());
        assert_eq!(
            unimplemented.to_string(),
            "Installer kind 'istio' for module platform/mesh is not implemented"
        );
        assert_eq!(no_installer.kind(), "configuration");
    }

    #[test]
    fn test_delegate_error_includes_operation_and_cause() {
        let error = LifecycleError::Delegate {
            namespace: "platform".to_string(),
            name: "ingress".to_string(),
            operation: "Install",
            source: anyhow::anyhow!("helm exited with status 1"),
        };

        assert_eq!(
            error.to_string(),
            "Install failed for module platform/ingress: helm exited with status 1"
        );
        assert!(!error.is_configuration());
        assert_eq!(error.kind(), "delegate");
    }

    #[test]
    fn test_status_code_helpers() {
        assert!(is_conflict_error(&api_error(409)));
        assert!(!is_conflict_error(&api_error(404)));
    }
}
