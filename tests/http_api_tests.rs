use std::sync::Arc;

use folio_admin::gateway::{ExcludeSet, FileSystemGateway};
use folio_admin::locks::KeyedLocks;
use folio_admin::server::{self, AppState, ADMIN_TOKEN_HEADER, REVISION_HEADER};
use folio_admin::storage::MemoryBackend;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

async fn start_ephemeral(root: &std::path::Path, token: Option<&str>) -> (JoinHandle<()>, String) {
    let gateway = FileSystemGateway::new(root, ExcludeSet::defaults(), Arc::new(KeyedLocks::new())).expect("gateway");
    let state = AppState::new(Arc::new(MemoryBackend::new()), gateway, token.map(|t| t.to_string())).expect("state");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state).await { eprintln!("http server task error: {e:?}"); }
    });
    (handle, format!("http://{addr}"))
}

fn titles(items: &Value) -> Vec<String> {
    items.as_array().unwrap().iter().map(|i| i["title"].as_str().unwrap().to_string()).collect()
}

fn revision(resp: &reqwest::Response) -> u64 {
    resp.headers().get(REVISION_HEADER).unwrap().to_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn collection_lifecycle_over_http() {
    let tmp = tempfile::tempdir().unwrap();
    let (handle, base) = start_ephemeral(tmp.path(), None).await;
    let client = reqwest::Client::new();

    let names: Vec<String> = client.get(format!("{base}/collections")).send().await.unwrap().json().await.unwrap();
    assert_eq!(names, vec!["feedback", "projects", "services", "users"]);

    let resp = client.get(format!("{base}/collections/projects")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(revision(&resp), 0);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!([]));

    for t in ["A", "B", "C"] {
        let resp = client.post(format!("{base}/collections/projects"))
            .json(&json!({"title": t, "tags": ["web"]}))
            .send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let items: Value = client.get(format!("{base}/collections/projects")).send().await.unwrap().json().await.unwrap();
    assert_eq!(titles(&items), vec!["A", "B", "C"]);
    let ids: Vec<String> = items.as_array().unwrap().iter().map(|i| i["id"].as_str().unwrap().to_string()).collect();
    assert!(items.as_array().unwrap().iter().all(|i| i["visible"] == json!(true)));

    let resp = client.put(format!("{base}/collections/projects/{}/reorder", ids[2]))
        .json(&json!({"direction": "up"}))
        .send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(revision(&resp), 4);
    let items: Value = resp.json().await.unwrap();
    assert_eq!(titles(&items), vec!["A", "C", "B"]);
    let orders: Vec<u64> = items.as_array().unwrap().iter().map(|i| i["order"].as_u64().unwrap()).collect();
    assert_eq!(orders, vec![0, 1, 2]);

    // top item moved up is a no-op without a revision bump
    let resp = client.patch(format!("{base}/collections/projects/{}/reorder", ids[0]))
        .json(&json!({"direction": "up"}))
        .send().await.unwrap();
    assert_eq!(revision(&resp), 4);

    let items: Value = client.put(format!("{base}/collections/projects/{}/visibility", ids[1]))
        .send().await.unwrap().json().await.unwrap();
    let b = items.as_array().unwrap().iter().find(|i| i["id"] == json!(ids[1])).unwrap();
    assert_eq!(b["visible"], json!(false));

    let items: Value = client.patch(format!("{base}/collections/projects/{}", ids[0]))
        .json(&json!({"description": "first project", "order": 2}))
        .send().await.unwrap().json().await.unwrap();
    assert_eq!(titles(&items), vec!["C", "B", "A"]);
    assert_eq!(items[2]["description"], json!("first project"));

    let resp = client.delete(format!("{base}/collections/projects/{}", ids[2])).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let items: Value = resp.json().await.unwrap();
    assert_eq!(titles(&items), vec!["B", "A"]);
    assert_eq!(items[0]["order"], json!(0));
    assert_eq!(items[1]["order"], json!(1));

    handle.abort();
}

#[tokio::test]
async fn collection_errors_use_the_envelope() {
    let tmp = tempfile::tempdir().unwrap();
    let (handle, base) = start_ephemeral(tmp.path(), None).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/collections/blog")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], json!("error"));
    assert_eq!(body["kind"], json!("NotFound"));
    assert_eq!(body["code"], json!("collection_not_found"));

    let resp = client.put(format!("{base}/collections/services/ghost/visibility")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.json::<Value>().await.unwrap()["code"], json!("item_not_found"));

    let resp = client.post(format!("{base}/collections/feedback"))
        .json(&json!({"name": "Ana", "message": "great", "rating": 9}))
        .send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], json!("InvalidInput"));
    assert_eq!(body["code"], json!("rating_out_of_range"));

    let resp = client.post(format!("{base}/collections/services"))
        .header("content-type", "application/json")
        .body("{not json")
        .send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.json::<Value>().await.unwrap()["kind"], json!("InvalidInput"));

    let resp = client.post(format!("{base}/collections/services"))
        .json(&json!({"title": "Design"}))
        .send().await.unwrap();
    let id = resp.json::<Value>().await.unwrap()[0]["id"].as_str().unwrap().to_string();
    let resp = client.put(format!("{base}/collections/services/{id}/reorder"))
        .json(&json!({"direction": "sideways"}))
        .send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    handle.abort();
}

#[tokio::test]
async fn stale_revision_is_a_conflict() {
    let tmp = tempfile::tempdir().unwrap();
    let (handle, base) = start_ephemeral(tmp.path(), None).await;
    let client = reqwest::Client::new();

    let resp = client.post(format!("{base}/collections/services?revision=0"))
        .json(&json!({"title": "Hosting"}))
        .send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(revision(&resp), 1);

    let resp = client.post(format!("{base}/collections/services?revision=0"))
        .json(&json!({"title": "Audits"}))
        .send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(resp.json::<Value>().await.unwrap()["kind"], json!("ConcurrencyConflict"));

    let items: Value = client.get(format!("{base}/collections/services")).send().await.unwrap().json().await.unwrap();
    assert_eq!(titles(&items), vec!["Hosting"]);

    handle.abort();
}

#[tokio::test]
async fn admin_token_gates_every_route() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("index.html"), "<h1>hi</h1>").unwrap();
    let (handle, base) = start_ephemeral(tmp.path(), Some("s3cret")).await;
    let client = reqwest::Client::new();

    let health = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    for url in [format!("{base}/collections"), format!("{base}/collections/projects"), format!("{base}/files/tree"), format!("{base}/files?path=index.html")] {
        let resp = client.get(&url).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{url}");
        assert_eq!(resp.json::<Value>().await.unwrap()["kind"], json!("Unauthorized"));
        let resp = client.get(&url).header(ADMIN_TOKEN_HEADER, "wrong").send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{url}");
        let resp = client.get(&url).header(ADMIN_TOKEN_HEADER, "s3cret").send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{url}");
    }

    // rejected before the body is looked at
    let resp = client.post(format!("{base}/collections/projects")).body("garbage").send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    handle.abort();
}

#[tokio::test]
async fn file_editor_over_http() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("site");
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    std::fs::write(root.join("src/App.tsx"), "export default App;\n").unwrap();
    std::fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();
    std::fs::write(tmp.path().join("secret.txt"), "do not read").unwrap();
    let (handle, base) = start_ephemeral(&root, None).await;
    let client = reqwest::Client::new();

    let tree: Value = client.get(format!("{base}/files/tree")).send().await.unwrap().json().await.unwrap();
    assert_eq!(tree["kind"], json!("directory"));
    let top: Vec<&str> = tree["children"].as_array().unwrap().iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(top, vec!["src"]);

    let tree: Value = client.get(format!("{base}/files/tree?exclude=*.tsx")).send().await.unwrap().json().await.unwrap();
    assert!(tree["children"].as_array().map(|c| c.is_empty()).unwrap_or(true));

    let body: Value = client.get(format!("{base}/files?path=src/App.tsx")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["content"], json!("export default App;\n"));

    let resp = client.post(format!("{base}/files"))
        .json(&json!({"path": "src/App.tsx", "content": "export default Home;\n"}))
        .send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(std::fs::read_to_string(root.join("src/App.tsx")).unwrap(), "export default Home;\n");

    let resp = client.post(format!("{base}/files/create"))
        .json(&json!({"path": "src/pages/About.tsx"}))
        .send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(std::fs::read_to_string(root.join("src/pages/About.tsx")).unwrap(), "");

    let resp = client.post(format!("{base}/files/create"))
        .json(&json!({"path": "src/App.tsx", "content": "clobber"}))
        .send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(resp.json::<Value>().await.unwrap()["kind"], json!("AlreadyExists"));

    let resp = client.get(format!("{base}/files?path=../secret.txt")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.json::<Value>().await.unwrap()["kind"], json!("InvalidPath"));

    let resp = client.get(format!("{base}/files?path=src/missing.ts")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client.delete(format!("{base}/files?path=src/pages/About.tsx")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!root.join("src/pages/About.tsx").exists());

    let resp = client.delete(format!("{base}/files?path=src/pages/About.tsx")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    handle.abort();
}

#[tokio::test]
async fn write_without_content_leaves_file_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("README.md"), "# Portfolio\n").unwrap();
    let (handle, base) = start_ephemeral(tmp.path(), None).await;
    let client = reqwest::Client::new();

    let resp = client.post(format!("{base}/files"))
        .json(&json!({"path": "README.md"}))
        .send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], json!("InvalidInput"));
    assert_eq!(body["code"], json!("invalid_body"));
    assert_eq!(std::fs::read_to_string(tmp.path().join("README.md")).unwrap(), "# Portfolio\n");

    // an explicit empty string is a real edit
    let resp = client.post(format!("{base}/files"))
        .json(&json!({"path": "README.md", "content": ""}))
        .send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(std::fs::read_to_string(tmp.path().join("README.md")).unwrap(), "");

    handle.abort();
}
