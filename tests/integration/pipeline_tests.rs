//! Integration tests for the pipeline
//!
//! These tests use wiremock to stand in for the listing site, the GitHub
//! contents and issues APIs, and the chat-completion endpoint, and run the
//! full read, crawl, merge, and write cycle end-to-end.

use base64::Engine;
use filing_watch::config::{
    ClassifierConfig, Config, ListingConfig, Secrets, StoreConfig, UserAgentConfig,
};
use filing_watch::index::{parse_records, render_document, IndexLayout};
use filing_watch::{run_pipeline, FilingRecord, Materiality, Timestamp, WatchError};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const CONTENTS_PATH: &str = "/repos/owner/filings/contents/8-Ks.md";

/// Creates a test configuration pointing every remote at `base_url`
fn create_test_config(base_url: &str, classify: bool) -> Config {
    Config {
        listing: ListingConfig {
            base_url: base_url.to_string(),
            item_code: "1.05".to_string(),
            form_type: "8-K".to_string(),
            marker_phrase: "Current report".to_string(),
            page_size: 40,
            timeout_secs: 5,
            max_attempts: 2,
            initial_backoff_ms: 10,
            max_backoff_ms: 20,
        },
        user_agent: UserAgentConfig {
            client_name: "TestWatch".to_string(),
            client_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        store: StoreConfig {
            api_url: base_url.to_string(),
            owner: "owner".to_string(),
            repo: "filings".to_string(),
            path: "8-Ks.md".to_string(),
            branch: None,
            token_env: "UNUSED".to_string(),
            timeout_secs: 5,
            write_attempts: 3,
            notify: true,
            issue_labels: vec!["new-filing".to_string()],
        },
        classifier: classify.then(|| ClassifierConfig {
            endpoint: format!("{}/v1/chat/completions", base_url),
            model: "test-model".to_string(),
            api_key_env: "UNUSED".to_string(),
            max_text_bytes: 10_000,
            end_marker: "forward-looking statements".to_string(),
            timeout_secs: 5,
        }),
    }
}

fn secrets(classify: bool) -> Secrets {
    Secrets {
        store_token: "gh-token".to_string(),
        classifier_key: classify.then(|| "model-key".to_string()),
    }
}

fn entry(company: &str, slug: &str, items: &str, date: &str, time: &str) -> String {
    format!(
        r##"<tr><td bgcolor="#E6E6E6" colspan="4"><a href="/cgi-bin/browse-edgar?action=getcompany">{company} (0000000001) (Filer)</a></td></tr>
        <tr><td nowrap="nowrap">8-K</td>
        <td nowrap="nowrap"><a href="/Archives/{slug}-index.htm">[html]</a></td>
        <td class="small">Current report, items {items}<br/>Accession Number: {slug}</td>
        <td nowrap="nowrap">{date}<br/>{time}</td><td nowrap="nowrap">{date}</td></tr>"##
    )
}

fn listing_page(entries: &[String], next: bool) -> String {
    let button = if next {
        r#"<input type="button" value="Next 40" onclick="next()"/>"#
    } else {
        ""
    };
    format!(
        "<html><body><table><tr><th>Form</th><th>Formats</th><th>Description</th><th>Accepted</th></tr>{}</table>{}</body></html>",
        entries.join("\n"),
        button
    )
}

fn stored_index(base_url: &str, classified: bool) -> String {
    let old = FilingRecord {
        form_type: "8-K".to_string(),
        company: "Old Corp".to_string(),
        timestamp: Timestamp::parse_canonical("2024-01-02 10:00:00").unwrap(),
        materiality: Materiality::NotMaterial,
        link: format!("{}/Archives/old-index.htm", base_url),
    };
    let layout = IndexLayout {
        item_code: "1.05".to_string(),
        classified,
    };
    render_document(&[old], &layout, Timestamp::epoch())
}

async fn mount_listing(server: &MockServer, start: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/browse-edgar"))
        .and(query_param("start", start))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Decodes the document carried by each contents PUT
async fn written_documents(server: &MockServer) -> Vec<String> {
    let requests: Vec<Request> = server.received_requests().await.unwrap_or_default();
    requests
        .iter()
        .filter(|r| r.method.to_string() == "PUT" && r.url.path() == CONTENTS_PATH)
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            let encoded = body["content"].as_str().unwrap();
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .unwrap();
            String::from_utf8(bytes).unwrap()
        })
        .collect()
}

#[tokio::test]
async fn test_full_run_with_classification() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_listing(
        &server,
        "0",
        listing_page(
            &[
                entry("Alpha Inc", "alpha", "1.05 and 9.01", "2024-01-05", "12:00:00"),
                entry("Beta LLC", "beta", "2.02", "2024-01-04", "09:00:00"),
            ],
            true,
        ),
    )
    .await;
    mount_listing(
        &server,
        "40",
        listing_page(
            &[
                entry("Gamma Co", "gamma", "1.05", "2024-01-03", "08:00:00"),
                entry("Old Corp", "old", "1.05", "2024-01-02", "10:00:00"),
            ],
            true,
        ),
    )
    .await;
    // Never reached: page 1 already goes back to the watermark
    Mock::given(method("GET"))
        .and(path("/cgi-bin/browse-edgar"))
        .and(query_param("start", "80"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[], false)))
        .expect(0)
        .mount(&server)
        .await;

    for slug in ["alpha", "gamma"] {
        Mock::given(method("GET"))
            .and(path(format!("/Archives/{}.txt", slug)))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><p>Item 1.05 Material Cybersecurity Incidents</p>\
                 <p>Operations were disrupted.</p>\
                 <p>Forward-looking statements follow.</p></body></html>",
            ))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({"model": "test-model"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "True"}}]
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"sha-1\"")
                .set_body_string(stored_index(&base_url, true)),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(CONTENTS_PATH))
        .and(body_partial_json(serde_json::json!({"sha": "sha-1"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/owner/filings/issues"))
        .and(body_partial_json(serde_json::json!({
            "title": "2 new Form 8-K filings with item 1.05",
            "labels": ["new-filing"]
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let report = run_pipeline(&create_test_config(&base_url, true), &secrets(true))
        .await
        .expect("Pipeline run failed");

    assert_eq!(report.new_records, 2);
    assert_eq!(report.total_records, 3);
    assert!(report.written);
    assert!(report.notified);

    let documents = written_documents(&server).await;
    assert_eq!(documents.len(), 1);
    let records = parse_records(&documents[0]);
    let companies: Vec<&str> = records.iter().map(|r| r.company.as_str()).collect();
    assert_eq!(companies, vec!["Alpha Inc", "Gamma Co", "Old Corp"]);
    assert_eq!(records[0].materiality, Materiality::Material);
    assert_eq!(records[1].materiality, Materiality::Material);
    assert_eq!(records[2].materiality, Materiality::NotMaterial);
    assert_eq!(records[0].link, format!("{}/Archives/alpha-index.htm", base_url));
}

#[tokio::test]
async fn test_first_run_creates_index() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_listing(
        &server,
        "0",
        listing_page(
            &[entry("Alpha Inc", "alpha", "1.05", "2024-01-05", "12:00:00")],
            false,
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/owner/filings/issues"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let report = run_pipeline(&create_test_config(&base_url, false), &secrets(false))
        .await
        .expect("Pipeline run failed");

    assert_eq!(report.new_records, 1);
    assert_eq!(report.total_records, 1);

    let documents = written_documents(&server).await;
    let body: serde_json::Value = {
        let requests = server.received_requests().await.unwrap_or_default();
        let put = requests
            .iter()
            .find(|r| r.method.to_string() == "PUT")
            .expect("no PUT request");
        serde_json::from_slice(&put.body).unwrap()
    };
    assert!(body.get("sha").is_none());
    assert_eq!(body["message"], "Create 8-Ks.md");

    let records = parse_records(&documents[0]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].company, "Alpha Inc");
    assert_eq!(records[0].materiality, Materiality::Unclear);
    assert!(!documents[0].contains("|Material|"));
}

#[tokio::test]
async fn test_write_conflict_is_retried() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_listing(
        &server,
        "0",
        listing_page(
            &[
                entry("Alpha Inc", "alpha", "1.05", "2024-01-05", "12:00:00"),
                entry("Old Corp", "old", "1.05", "2024-01-02", "10:00:00"),
            ],
            true,
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"sha-1\"")
                .set_body_string(stored_index(&base_url, false)),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(409).set_body_string("sha does not match"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/owner/filings/issues"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let report = run_pipeline(&create_test_config(&base_url, false), &secrets(false))
        .await
        .expect("Pipeline run failed");

    assert!(report.written);
    assert_eq!(report.new_records, 1);

    let documents = written_documents(&server).await;
    assert_eq!(documents.len(), 2);
    let companies: Vec<String> = parse_records(&documents[1])
        .into_iter()
        .map(|r| r.company)
        .collect();
    assert_eq!(companies, vec!["Alpha Inc", "Old Corp"]);
}

#[tokio::test]
async fn test_failed_read_recovers_through_create_conflict() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_listing(
        &server,
        "0",
        listing_page(
            &[
                entry("Alpha Inc", "alpha", "1.05", "2024-01-05", "12:00:00"),
                entry("Old Corp", "old", "1.05", "2024-01-02", "10:00:00"),
            ],
            false,
        ),
    )
    .await;
    // First read fails, so the run believes the file is missing
    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"sha-1\"")
                .set_body_string(stored_index(&base_url, false)),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(CONTENTS_PATH))
        .and(body_partial_json(serde_json::json!({"sha": "sha-1"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .with_priority(1)
        .mount(&server)
        .await;
    // A create without sha over an existing file
    Mock::given(method("PUT"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(422).set_body_string("\"sha\" wasn't supplied"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/owner/filings/issues"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let report = run_pipeline(&create_test_config(&base_url, false), &secrets(false))
        .await
        .expect("Pipeline run failed");

    assert!(report.written);
    assert_eq!(report.new_records, 1);
    assert_eq!(report.total_records, 2);

    let documents = written_documents(&server).await;
    assert_eq!(documents.len(), 2);
    let records = parse_records(&documents[1]);
    let companies: Vec<&str> = records.iter().map(|r| r.company.as_str()).collect();
    assert_eq!(companies, vec!["Alpha Inc", "Old Corp"]);
    assert_eq!(records[1].link, format!("{}/Archives/old-index.htm", base_url));
}

#[tokio::test]
async fn test_unavailable_listing_writes_nothing() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/cgi-bin/browse-edgar"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CONTENTS_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let result = run_pipeline(&create_test_config(&base_url, false), &secrets(false)).await;

    assert!(matches!(
        result,
        Err(WatchError::ListingUnavailable { status: 503, .. })
    ));
}
