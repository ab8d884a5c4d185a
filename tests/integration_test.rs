use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::{Matcher, Server};
use predicates::prelude::*;

fn bullhorn() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("bullhorn"));
    cmd.env_remove("BULLHORN_SESSION_TOKEN")
        .env_remove("BULLHORN_REST_URL");
    cmd
}

#[test]
fn test_ping_prints_session_expiry() {
    let mut server = Server::new();
    let rest_url = format!("{}/rest-services/1234/", server.url());

    let mock = server
        .mock("GET", "/rest-services/1234/ping")
        .match_header("BhRestToken", "12345_1234567")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"sessionExpires": 1234567891011}"#)
        .create();

    bullhorn()
        .arg("--rest-url")
        .arg(&rest_url)
        .arg("--token")
        .arg("12345_1234567")
        .arg("ping")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sessionExpires\": 1234567891011"));

    mock.assert();
}

#[test]
fn test_search_reads_session_from_env() {
    let mut server = Server::new();
    let rest_url = format!("{}/", server.url());

    let mock = server
        .mock("GET", "/search/Candidate")
        .match_header("BhRestToken", "env-token")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("query".into(), "isDeleted:0".into()),
            Matcher::UrlEncoded("fields".into(), "id,firstName".into()),
            Matcher::UrlEncoded("count".into(), "2".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "total": 40,
                "start": 0,
                "count": 2,
                "data": [
                    {"id": 1, "firstName": "Ann"},
                    {"id": 2, "firstName": "Bo"}
                ]
            }"#,
        )
        .create();

    bullhorn()
        .env("BULLHORN_REST_URL", &rest_url)
        .env("BULLHORN_SESSION_TOKEN", "env-token")
        .args([
            "search",
            "Candidate",
            "isDeleted:0",
            "--fields",
            "id,firstName",
            "--count",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"firstName\": \"Ann\""))
        .stdout(predicate::str::contains("\"firstName\": \"Bo\""));

    mock.assert();
}

#[test]
fn test_query_all_follows_pages() {
    let mut server = Server::new();
    let rest_url = format!("{}/", server.url());

    let first = server
        .mock("GET", "/query/JobOrder")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("where".into(), "isOpen=true".into()),
            Matcher::UrlEncoded("start".into(), "0".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"start": 0, "count": 2, "data": [{"id": 10}, {"id": 11}]}"#)
        .create();
    let second = server
        .mock("GET", "/query/JobOrder")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("where".into(), "isOpen=true".into()),
            Matcher::UrlEncoded("start".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"start": 2, "count": 1, "data": [{"id": 12}]}"#)
        .create();

    bullhorn()
        .args(["--rest-url", &rest_url, "query", "JobOrder", "isOpen=true"])
        .args(["--count", "2", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": 10"))
        .stdout(predicate::str::contains("\"id\": 12"));

    first.assert();
    second.assert();
}

#[test]
fn test_get_not_found_exits_with_error() {
    let mut server = Server::new();
    let rest_url = format!("{}/", server.url());

    let _mock = server
        .mock("GET", "/entity/Candidate/1")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"errorMessage": "Cannot find entity of type Candidate with id 1", "errorCode": 404}"#)
        .create();

    bullhorn()
        .args(["--rest-url", &rest_url, "get", "Candidate", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("404 Not Found (error code: 404)"))
        .stderr(predicate::str::contains("Cannot find entity of type Candidate"));
}

#[test]
fn test_missing_rest_url_fails() {
    bullhorn()
        .arg("ping")
        .assert()
        .failure()
        .stderr(predicate::str::contains("BULLHORN_REST_URL"));
}
