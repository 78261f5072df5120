//! Concurrent submissions are independent of each other.

use std::sync::Arc;

use event_collector::config::ServiceConfig;

mod common;
use common::{client, spawn_server, MemoryStore, StubGeo, CHROME_MAC};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mixed_requests() {
    let store = Arc::new(MemoryStore::default());
    let server = spawn_server(ServiceConfig::default(), store.clone(), Arc::new(StubGeo)).await;
    let client = client();

    let mut tasks = Vec::new();
    for i in 0..50 {
        let client = client.clone();
        let url = server.url("/record_event");
        tasks.push(tokio::spawn(async move {
            let body = if i % 5 == 0 {
                r#"{"Deep":"not-a-bool"}"#.to_string()
            } else {
                format!(r#"{{"Event_name":"e{i}","Deep":{}}}"#, i % 2 == 0)
            };
            let res = client
                .post(url)
                .header("user-agent", CHROME_MAC)
                .body(body)
                .send()
                .await
                .unwrap();
            (i, res.status().as_u16(), res.text().await.unwrap())
        }));
    }

    let mut ok = 0;
    for task in tasks {
        let (i, status, body) = task.await.unwrap();
        if i % 5 == 0 {
            assert_eq!((status, body.as_str()), (400, "KO"), "request {i}");
        } else {
            assert_eq!((status, body.as_str()), (200, "OK"), "request {i}");
            ok += 1;
        }
    }

    assert_eq!(ok, 40);
    let rows = store.rows();
    assert_eq!(rows.len(), 40);

    let mut names: Vec<_> = rows
        .iter()
        .map(|(_, d)| d["Event_name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 40);

    for (_, details) in &rows {
        let deep = details["Deep"].as_bool().unwrap();
        assert_eq!(details["IpData"].is_null(), !deep);
    }
}
