use vehgen_core::config::GeneratorConfig;
use vehgen_io::{build_sink_from_config, Error};

#[test]
fn memory_sink_builder_upload_and_list() {
    let mut cfg = GeneratorConfig::default();
    cfg.storage_uri = Some("memory://".into());

    let sink = build_sink_from_config(&cfg.storage_config()).expect("memory sink");
    let receipt = sink
        .upload("20210630/a.csv.gz", &mut &b"hello world"[..], false)
        .expect("upload");
    assert_eq!(receipt.bytes, 11);
    assert!(sink.exists("20210630/a.csv.gz").unwrap());
    assert_eq!(sink.list("20210630/").unwrap(), vec!["20210630/a.csv.gz".to_string()]);
}

#[test]
fn file_sink_builder_writes_under_container() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = GeneratorConfig::default();
    cfg.storage_uri = Some(format!("file://{}", dir.path().display()));
    cfg.container_name = "vehicle-data".into();

    let sink = build_sink_from_config(&cfg.storage_config()).expect("file sink");
    sink.upload("20210630/x.csv", &mut &b"vin\n"[..], false)
        .expect("upload");
    let stored = std::fs::read(dir.path().join("vehicle-data/20210630/x.csv")).unwrap();
    assert_eq!(stored, b"vin\n");
}

#[test]
fn no_overwrite_rejects_second_upload() {
    let mut cfg = GeneratorConfig::default();
    cfg.storage_uri = Some("memory://".into());
    let sink = build_sink_from_config(&cfg.storage_config()).unwrap();

    sink.upload("d/x", &mut &b"1"[..], false).unwrap();
    let err = sink.upload("d/x", &mut &b"2"[..], false).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
    sink.upload("d/x", &mut &b"3"[..], true).unwrap();
}

#[test]
fn invalid_scheme_errors() {
    let mut cfg = GeneratorConfig::default();
    cfg.storage_uri = Some("ftp://example.com/drop".into());
    let err = build_sink_from_config(&cfg.storage_config())
        .err()
        .expect("should fail");
    assert!(err.to_string().contains("unsupported storage scheme"));
}

#[test]
fn missing_sink_settings_error() {
    let cfg = GeneratorConfig::default();
    let err = build_sink_from_config(&cfg.storage_config())
        .err()
        .expect("should fail");
    assert!(err.to_string().contains("no upload sink configured"));
}

#[cfg(not(feature = "azure"))]
#[test]
fn azure_without_feature_fails() {
    let mut cfg = GeneratorConfig::default();
    cfg.storage_connection_string = Some("AccountName=fleet;AccountKey=a2V5".into());
    let err = build_sink_from_config(&cfg.storage_config())
        .err()
        .expect("feature missing");
    assert!(err.to_string().contains("built without the `azure` feature"));
}

#[cfg(feature = "azure")]
#[test]
fn azure_builder_initializes_with_dummy_credentials() {
    let mut cfg = GeneratorConfig::default();
    cfg.storage_connection_string = Some("AccountName=devacct;AccountKey=a2V5".into());
    cfg.container_name = "telemetry".into();
    build_sink_from_config(&cfg.storage_config()).expect("azure sink");
}
