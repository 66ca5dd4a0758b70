use axum::http::StatusCode;
use axum_test::TestServer;
use agile_manifest::api::create_router;
use agile_manifest::backlog::Backlog;
use agile_manifest::db::Database;
use agile_manifest::models::*;
use hierarchy_core::RecordRef;
use serde_json::{json, Value};

fn setup() -> TestServer {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let app = create_router(Backlog::open(db));
    TestServer::new(app).expect("Failed to create test server")
}

async fn create_test_project(server: &TestServer) -> Project {
    server
        .post("/api/v1/projects")
        .json(&CreateProjectInput {
            name: "Test Project".to_string(),
            description: None,
        })
        .await
        .json::<Project>()
}

/// Create a record through the matching endpoint and return its reference.
async fn create(server: &TestServer, project: &Project, path: &str, body: Value) -> RecordRef {
    let response = server
        .post(&format!("/api/v1/projects/{}/{}", project.id, path))
        .json(&body)
        .await;
    response.assert_status(StatusCode::CREATED);

    let record: Value = response.json();
    let type_name = match path {
        "epics" => "Epic".to_string(),
        "features" => "Feature".to_string(),
        "user-stories" => "UserStory".to_string(),
        _ => record["kind"].as_str().expect("kind missing").to_string(),
    };
    RecordRef::new(type_name, record["id"].as_i64().expect("id missing"))
}

fn record_path(record: &RecordRef) -> String {
    format!("/api/v1/records/{}/{}", record.type_name, record.id)
}

async fn put_parent(
    server: &TestServer,
    child: &RecordRef,
    parent: Option<&RecordRef>,
) -> axum_test::TestResponse {
    server
        .put(&format!("{}/parent", record_path(child)))
        .json(&SetParentInput {
            parent: parent.cloned(),
        })
        .await
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        let server = setup();
        let response = server.get("/api/v1/health").await;

        response.assert_status_ok();
        response.assert_json(&json!({ "status": "ok" }));
    }
}

mod projects {
    use super::*;

    #[tokio::test]
    async fn returns_404_for_unknown_project() {
        let server = setup();
        let response = server
            .get(&format!("/api/v1/projects/{}", uuid::Uuid::new_v4()))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn updates_and_deletes_a_project() {
        let server = setup();
        let project = create_test_project(&server).await;

        let updated = server
            .put(&format!("/api/v1/projects/{}", project.id))
            .json(&json!({ "name": "Renamed" }))
            .await
            .json::<Project>();
        assert_eq!(updated.name, "Renamed");

        server
            .delete(&format!("/api/v1/projects/{}", project.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get(&format!("/api/v1/projects/{}", project.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn returns_404_when_creating_records_in_unknown_project() {
        let server = setup();
        let missing = uuid::Uuid::new_v4();

        for (path, body) in [
            ("epics", json!({ "title": "Lost" })),
            ("items", json!({ "kind": "Ticket", "title": "Lost" })),
        ] {
            let response = server
                .post(&format!("/api/v1/projects/{}/{}", missing, path))
                .json(&body)
                .await;

            response.assert_status(StatusCode::NOT_FOUND);
            assert!(response.text().contains(&missing.to_string()));
        }
    }
}

mod records {
    use super::*;

    #[tokio::test]
    async fn creates_and_fetches_an_item() {
        let server = setup();
        let project = create_test_project(&server).await;
        let risk = create(
            &server,
            &project,
            "items",
            json!({ "kind": "Risk", "title": "Vendor delay", "details": "Second source" }),
        )
        .await;

        let response = server.get(&record_path(&risk)).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["category"], "item");
        assert_eq!(body["details"], "Second source");
    }

    #[tokio::test]
    async fn returns_404_for_wrong_kind() {
        let server = setup();
        let project = create_test_project(&server).await;
        let risk = create(&server, &project, "items", json!({ "kind": "Risk", "title": "R" })).await;

        server
            .get(&format!("/api/v1/records/Ticket/{}", risk.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn updates_common_fields() {
        let server = setup();
        let project = create_test_project(&server).await;
        let epic = create(&server, &project, "epics", json!({ "title": "Platform" })).await;

        let response = server
            .put(&record_path(&epic))
            .json(&json!({ "state": "active" }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["state"], "active");
        assert_eq!(body["title"], "Platform");
    }

    #[tokio::test]
    async fn deletes_a_record() {
        let server = setup();
        let project = create_test_project(&server).await;
        let epic = create(&server, &project, "epics", json!({ "title": "Platform" })).await;

        server
            .delete(&record_path(&epic))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .delete(&record_path(&epic))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lists_project_records() {
        let server = setup();
        let project = create_test_project(&server).await;
        create(&server, &project, "features", json!({ "title": "Auth" })).await;
        create(&server, &project, "epics", json!({ "title": "Platform" })).await;

        let records: Vec<RecordSummary> = server
            .get(&format!("/api/v1/projects/{}/records", project.id))
            .await
            .json();

        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Platform", "Auth"]);
    }
}

mod parent {
    use super::*;

    #[tokio::test]
    async fn moves_a_record_below_a_valid_parent() {
        let server = setup();
        let project = create_test_project(&server).await;
        let epic = create(&server, &project, "epics", json!({ "title": "Platform" })).await;
        let feature = create(&server, &project, "features", json!({ "title": "Auth" })).await;

        let response = put_parent(&server, &feature, Some(&epic)).await;

        response.assert_status_ok();
        let summary: RecordSummary = response.json();
        assert_eq!(summary.parent, Some(epic.clone()));

        let lookup: ParentLookup = server
            .get(&format!("{}/parent", record_path(&feature)))
            .await
            .json();
        let parent = lookup.parent.expect("parent missing");
        assert_eq!(parent.title, "Platform");
        assert_eq!(parent.id, epic.id);
    }

    #[tokio::test]
    async fn rejects_a_category_violation_with_the_rule() {
        let server = setup();
        let project = create_test_project(&server).await;
        let epic = create(&server, &project, "epics", json!({ "title": "Platform" })).await;
        let activity = create(
            &server,
            &project,
            "items",
            json!({ "kind": "Activity", "title": "X" }),
        )
        .await;

        let response = put_parent(&server, &activity, Some(&epic)).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let message = response.text();
        assert!(message.contains("Activity"), "{message}");
        assert!(message.contains("Epic"), "{message}");
    }

    #[tokio::test]
    async fn rejects_a_cycle_with_409() {
        let server = setup();
        let project = create_test_project(&server).await;
        let epic = create(&server, &project, "epics", json!({ "title": "Platform" })).await;
        let feature = create(&server, &project, "features", json!({ "title": "Auth" })).await;
        put_parent(&server, &feature, Some(&epic))
            .await
            .assert_status_ok();

        let response = put_parent(&server, &epic, Some(&feature)).await;

        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn clears_the_parent_with_null() {
        let server = setup();
        let project = create_test_project(&server).await;
        let epic = create(&server, &project, "epics", json!({ "title": "Platform" })).await;
        let feature = create(&server, &project, "features", json!({ "title": "Auth" })).await;
        put_parent(&server, &feature, Some(&epic))
            .await
            .assert_status_ok();

        let response = server
            .put(&format!("{}/parent", record_path(&feature)))
            .json(&json!({ "parent": null }))
            .await;

        response.assert_status_ok();
        let summary: RecordSummary = response.json();
        assert!(summary.parent.is_none());
    }

    #[tokio::test]
    async fn returns_null_for_a_deleted_parent() {
        let server = setup();
        let project = create_test_project(&server).await;
        let epic = create(&server, &project, "epics", json!({ "title": "Platform" })).await;
        let feature = create(&server, &project, "features", json!({ "title": "Auth" })).await;
        put_parent(&server, &feature, Some(&epic))
            .await
            .assert_status_ok();
        server
            .delete(&record_path(&epic))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let response = server
            .get(&format!("{}/parent", record_path(&feature)))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert!(body["parent"].is_null());
        assert_eq!(body["unresolved"]["type_name"], "Epic");
    }

    #[tokio::test]
    async fn returns_404_for_a_missing_parent() {
        let server = setup();
        let project = create_test_project(&server).await;
        let feature = create(&server, &project, "features", json!({ "title": "Auth" })).await;

        let response = put_parent(&server, &feature, Some(&RecordRef::new("Epic", 99))).await;

        response.assert_status(StatusCode::NOT_FOUND);
    }
}

mod hierarchy {
    use super::*;

    /// Epic "Platform" > Feature "Auth" > UserStory "Login" > Activity "Build form".
    #[tokio::test]
    async fn builds_a_release_plan() {
        let server = setup();
        let project = create_test_project(&server).await;
        let platform = create(&server, &project, "epics", json!({ "title": "Platform" })).await;
        let auth = create(&server, &project, "features", json!({ "title": "Auth" })).await;
        let login = create(
            &server,
            &project,
            "user-stories",
            json!({ "title": "Login", "story_points": 5 }),
        )
        .await;
        let build = create(
            &server,
            &project,
            "items",
            json!({ "kind": "Activity", "title": "Build form" }),
        )
        .await;

        put_parent(&server, &auth, Some(&platform)).await.assert_status_ok();
        put_parent(&server, &login, Some(&auth)).await.assert_status_ok();
        put_parent(&server, &build, Some(&login)).await.assert_status_ok();

        let tree: Vec<HierarchyTreeNode> = server
            .get(&format!("/api/v1/projects/{}/hierarchy", project.id))
            .await
            .json();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].record.title, "Platform");
        let leaf = &tree[0].children[0].children[0].children[0];
        assert_eq!(leaf.record.record_ref(), build);

        let children: Vec<RecordSummary> = server
            .get(&format!("{}/children", record_path(&login)))
            .await
            .json();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].title, "Build form");
    }

    #[tokio::test]
    async fn returns_404_for_unknown_project_tree() {
        let server = setup();
        server
            .get(&format!("/api/v1/projects/{}/hierarchy", uuid::Uuid::new_v4()))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lists_registered_types() {
        let server = setup();
        let types: Vec<Value> = server.get("/api/v1/types").await.json();

        let meeting = types
            .iter()
            .find(|t| t["name"] == "Meeting")
            .expect("Meeting not registered");
        assert_eq!(meeting["category"], "generic_item");
    }
}
