use almanac_core::errors::{CoreError, ExError, ExErrorKind};

#[test]
fn test_unknown_site_verifiable_by_kind() {
    let err = CoreError::UnknownSite {
        value: "ctio".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::UnknownSite);
    assert_eq!(ex_err.code(), "ERR_UNKNOWN_SITE");
    assert!(ex_err.message().contains("ctio"));
}

#[test]
fn test_config_error_carries_path() {
    let err = CoreError::Config {
        path: "/etc/almanac.toml".to_string(),
        reason: "expected a table".to_string(),
    };

    let ex_err: ExError = err.into();

    assert_eq!(ex_err.kind(), ExErrorKind::Config);
    assert_eq!(ex_err.path(), Some("/etc/almanac.toml"));
    assert_eq!(ex_err.op(), Some("load_config"));
}

#[test]
fn test_error_kind_code_mapping() {
    let kinds = vec![
        (ExErrorKind::InvalidScope, "ERR_INVALID_SCOPE"),
        (ExErrorKind::Collection, "ERR_COLLECTION"),
        (ExErrorKind::CrossMatch, "ERR_CROSS_MATCH"),
        (ExErrorKind::StoreWrite, "ERR_STORE_WRITE"),
        (ExErrorKind::Cancelled, "ERR_CANCELLED"),
        (ExErrorKind::WorkerProtocol, "ERR_WORKER_PROTOCOL"),
    ];

    for (kind, expected_code) in kinds {
        assert_eq!(kind.code(), expected_code);
    }
}

#[test]
fn test_source_chain_is_displayed() {
    let inner = ExError::new(ExErrorKind::Io).with_message("permission denied");
    let outer = ExError::new(ExErrorKind::Collection)
        .with_unit("apo/60000")
        .with_source(inner);

    assert_eq!(outer.source_error().map(|e| e.kind()), Some(ExErrorKind::Io));
    assert!(outer.to_string().contains("permission denied"));
    assert!(std::error::Error::source(&outer).is_some());
}
