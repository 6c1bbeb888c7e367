// src/tests/retrieval_tests.rs
// ApexLog retrieval and the retrieve → delete hand-off

use super::test_utils::{apex_log_json, ApiCall, FakeApi, FakeRunner};
use crate::config::ExtractorConfig;
use crate::deleter::{DeleteOutcome, LogDeleter, ID_CSV_FILE};
use crate::errors::ExtractorError;
use crate::retriever::LogRetriever;
use std::fs;

const DEBUG_USER: &str = "debug@example.com";

fn three_logs() -> FakeApi {
    FakeApi::new().with_query(
        "ApexLog",
        vec![
            apex_log_json("07L3", "2020-08-01T17:04:05.000+0000", 12),
            apex_log_json("07L2", "2020-08-01T16:00:00.000+0000", 9),
            apex_log_json("07L1", "2020-01-15T08:00:00.000+0000", 9),
        ],
    )
}

#[test]
fn no_logs_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("logs");
    let cfg = ExtractorConfig::default();
    let api = FakeApi::new();

    let report = LogRetriever::new(&api, &cfg, &dest).retrieve_logs(DEBUG_USER).unwrap();

    assert!(report.is_empty());
    assert!(report.ids().is_empty());
    assert!(!dest.exists() || fs::read_dir(&dest).unwrap().count() == 0);
    assert!(!api.calls().iter().any(|c| matches!(c, ApiCall::LogBody(_))));
}

#[test]
fn every_log_is_written_in_query_order() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ExtractorConfig::default();
    let api = three_logs()
        .with_log("07L3", "third body")
        .with_log("07L2", "second b")
        .with_log("07L1", "first bo");

    let report = LogRetriever::new(&api, &cfg, dir.path()).retrieve_logs(DEBUG_USER).unwrap();

    assert_eq!(report.ids(), vec!["07L3", "07L2", "07L1"]);
    let names: Vec<String> = report
        .logs
        .iter()
        .map(|l| l.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "20200801-100405-07L3.txt",
            "20200801-090000-07L2.txt",
            "20200115-000000-07L1.txt"
        ]
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("20200801-100405-07L3.txt")).unwrap(),
        "third body"
    );
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
}

#[test]
fn log_query_orders_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ExtractorConfig::default();
    let api = FakeApi::new();

    LogRetriever::new(&api, &cfg, dir.path()).retrieve_logs(DEBUG_USER).unwrap();

    let ApiCall::ToolingQuery(soql) = &api.calls()[0] else {
        panic!("expected tooling query");
    };
    assert!(soql.contains("FROM ApexLog WHERE LogUser.UserName = 'debug@example.com'"));
    assert!(soql.ends_with("ORDER BY LastModifiedDate DESC"));
}

#[test]
fn empty_body_aborts_without_later_files() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ExtractorConfig::default();
    let api = three_logs().with_log("07L3", "third body").with_log("07L2", "").with_log("07L1", "first");

    let err = LogRetriever::new(&api, &cfg, dir.path()).retrieve_logs(DEBUG_USER).unwrap_err();

    assert!(matches!(err, ExtractorError::EmptyLogBody { ref id } if id == "07L2"));
    let remaining: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(remaining.len(), 1);
    assert!(!api.calls().contains(&ApiCall::LogBody("07L1".into())));
}

#[test]
fn failed_body_fetch_aborts_the_pass() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ExtractorConfig::default();
    let api = three_logs().with_log("07L3", "third body");

    let err = LogRetriever::new(&api, &cfg, dir.path()).retrieve_logs(DEBUG_USER).unwrap_err();

    assert!(matches!(err, ExtractorError::Remote { .. }));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn delete_csv_matches_retrieved_ids() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ExtractorConfig::default();
    let api = three_logs()
        .with_log("07L3", "a")
        .with_log("07L2", "b")
        .with_log("07L1", "c");
    let runner = FakeRunner::new().with_output("Bulk delete job queued", 0);

    let report = LogRetriever::new(&api, &cfg, dir.path()).retrieve_logs(DEBUG_USER).unwrap();
    let outcome = LogDeleter::new(&runner, &cfg)
        .delete_retrieved_logs(&report.ids(), "admin@example.com", dir.path())
        .unwrap();

    let csv_path = dir.path().join(ID_CSV_FILE);
    assert_eq!(
        outcome,
        DeleteOutcome::Submitted {
            csv_path: csv_path.clone(),
            count: 3,
            output: "Bulk delete job queued".into(),
        }
    );

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    assert_eq!(reader.headers().unwrap().iter().collect::<Vec<_>>(), vec!["Id"]);
    let ids: Vec<String> = reader
        .records()
        .map(|r| r.unwrap().get(0).unwrap().to_string())
        .collect();
    assert_eq!(ids, report.ids());

    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].0, "sfdx");
    assert!(invocations[0].1.contains(&"--targetusername=admin@example.com".to_string()));
}

#[test]
fn delete_with_no_ids_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ExtractorConfig::default();
    let runner = FakeRunner::new();

    let outcome = LogDeleter::new(&runner, &cfg)
        .delete_retrieved_logs(&[], "admin@example.com", dir.path())
        .unwrap();

    assert_eq!(outcome, DeleteOutcome::NothingToDelete);
    assert!(runner.invocations().is_empty());
    assert!(!dir.path().join(ID_CSV_FILE).exists());
}

#[test]
fn failing_bulk_delete_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ExtractorConfig::default();
    let runner = FakeRunner::new().with_output("", 1);

    let err = LogDeleter::new(&runner, &cfg)
        .delete_retrieved_logs(&["07L1".to_string()], "admin@example.com", dir.path())
        .unwrap_err();

    assert!(matches!(err, ExtractorError::Process { .. }));
}
