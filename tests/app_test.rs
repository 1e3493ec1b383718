use rask_haproxy_ingest::app::{HOST_HEADER, dump, ingest};
use rask_haproxy_ingest::{
    App, Codec, Config, ContainerReader, LogRecord, SerializerBuilder, SerializerConfig,
};
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

const LOG: &str = concat!(
    r#"haproxy[18439]: 70.208.71.125:1545 [24/Nov/2014:13:59:25.582] http nginx/blink182 17/0/1/4/24 200 44332 cc=clienttime-1378732583324.version-35.essential.f - ---- 2422/2288/2/1/0 0/0 {www.telegraaf.nl|Mozilla/5.0} {text/html} "GET /telesport/ HTTP/1.1""#,
    "\r\n",
    "\n",
    r#"haproxy[13533]: 10.0.0.7:55080 [24/Nov/2014:13:59:26.001] https nginx/oasis 8/0/3/2/14 304 0 - - ---- 2860/2739/9/3/0 0/0 {} {} "HEAD /favicon.ico HTTP/1.0""#,
    "\n",
    "not an haproxy line\n",
);

#[test]
fn test_ingest_then_dump() {
    let builder = SerializerBuilder::new(SerializerConfig::new(2));
    let mut headers = BTreeMap::new();
    headers.insert("source".to_string(), "lb-01".to_string());

    let (container, stats) = ingest(LOG.as_bytes(), Vec::new(), &builder, &headers).unwrap();
    assert_eq!(stats.events, 3);
    assert_eq!(stats.grammar_mismatches, 1);
    assert_eq!(stats.blocks, 2);

    let mut out = Vec::new();
    let count = dump(container.as_slice(), &mut out).unwrap();
    assert_eq!(count, 3);

    let text = String::from_utf8(out).unwrap();
    let records: Vec<LogRecord> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.headers["source"] == "lb-01"));

    assert_eq!(records[0].ip, "70.208.71.125");
    assert_eq!(records[0].status_code, 200);
    assert_eq!(records[1].frontend, "https");
    assert_eq!(records[1].method, "HEAD");
    assert_eq!(records[1].protocol.as_deref(), Some("HTTP/1.0"));
    assert_eq!(records[2].original, "not an haproxy line");
    assert_eq!(records[2].status_code, 0);
}

#[test]
fn test_dump_json_shape() {
    let builder = SerializerBuilder::new(SerializerConfig::new(8).with_codec(Codec::Null));
    let (container, _) = ingest(LOG.as_bytes(), Vec::new(), &builder, &BTreeMap::new()).unwrap();

    let mut out = Vec::new();
    dump(container.as_slice(), &mut out).unwrap();
    let first: serde_json::Value =
        serde_json::from_slice(out.split(|b| *b == b'\n').next().unwrap()).unwrap();

    assert_eq!(first["frontend"], "http");
    assert_eq!(first["tt"], 24);
    assert_eq!(first["protocol"], "HTTP/1.1");
}

#[test]
fn test_dump_rejects_foreign_input() {
    let mut out = Vec::new();
    assert!(dump(&b"plain text, no container"[..], &mut out).is_err());
    assert!(out.is_empty());
}

#[test]
fn test_app_run_writes_container_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("access.log");
    let output = dir.path().join("access.avro");
    fs::write(&input, LOG).unwrap();

    let config = Config::from_args([
        "rask-haproxy-ingest",
        "--input",
        input.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
        "--sync-interval",
        "1",
        "--add-host-header",
    ])
    .unwrap();
    App::new(config).run().unwrap();

    let mut reader = ContainerReader::open(&output).unwrap();
    let records: Vec<LogRecord> = reader.by_ref().map(Result::unwrap).collect();

    assert_eq!(records.len(), 3);
    assert_eq!(reader.blocks_read(), 3);
    assert_eq!(reader.header().codec, Codec::Deflate);
    assert_eq!(records[0].frontend, "http");
    assert!(records.iter().all(|r| r.headers.contains_key(HOST_HEADER)));
}
