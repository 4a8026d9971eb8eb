//! Users Admin API Integration Tests
//!
//! Drives the users router end to end against the in-memory store.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, Request, StatusCode};
use axum::body::Body;
use tower::ServiceExt;

use common::*;
use roster_admin::{
    AdminError, Locale, NewUser, Page, PageRequest, PagingLimits, Translator, User, UserChanges,
    UserRepository, UserSort, UserWithRoles,
};

fn role_ids_of(store: &roster_admin::InMemoryStore, email: &str) -> Vec<i64> {
    store.find_user_by_email(email).expect("user").role_ids
}

mod list_tests {
    use super::*;

    #[tokio::test]
    async fn test_async_list_returns_envelope() {
        let store = store();
        seed_user(&store, 1, &[2, 5]).await;
        seed_user(&store, 2, &[]).await;
        seed_user(&store, 3, &[1]).await;

        let uri = format!("{}?page=1&pageSize=2&sortField=email&sortOrder=ascend", BASE);
        let response = app(&store).oneshot(xhr_get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = read_json(response).await;
        let data = &json["data"];
        assert_eq!(data["user"]["total"], 3);

        let users = data["users"]["users"].as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0]["email"], "user1@example.com");
        assert_eq!(users[1]["email"], "user2@example.com");
        assert!(users[0].get("password").is_none());

        let roles_of_first: Vec<i64> = users[0]["roles"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["value"].as_i64().unwrap())
            .collect();
        assert_eq!(roles_of_first, vec![2, 5]);
        assert_eq!(users[0]["roles"][0]["label"], "Editor");
        assert_eq!(users[0]["roles"][0]["key"], 2);

        let all_roles: Vec<i64> = data["roles"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect();
        assert_eq!(all_roles, vec![1, 2, 3, 4, 5]);
        assert_eq!(data["roles"][1]["name"], "Editor");
        assert!(data["roles"][0].get("label").is_none());
        assert!(data["roles"][0]["created_at"].is_string());
    }

    #[tokio::test]
    async fn test_user_rows_use_snake_case_timestamps() {
        let store = store();
        seed_user(&store, 1, &[]).await;

        let json = read_json(app(&store).oneshot(xhr_get(BASE)).await.unwrap()).await;
        let row = &json["data"]["users"]["users"][0];
        assert!(row["created_at"].is_string());
        assert!(row["updated_at"].is_string());
        assert!(row.get("createdAt").is_none());
    }

    #[tokio::test]
    async fn test_unparsable_page_size_uses_default() {
        let store = store();
        for n in 1..=4 {
            seed_user(&store, n, &[]).await;
        }
        let state = state(&store).with_paging(PagingLimits { default_page_size: 3, max_page_size: 10 });
        let app = app_with(state);

        for raw in ["-1", "abc"] {
            let uri = format!("{}?page=1&pageSize={}", BASE, raw);
            let response = app.clone().oneshot(xhr_get(&uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "pageSize={}", raw);
            let json = read_json(response).await;
            assert_eq!(json["data"]["users"]["users"].as_array().unwrap().len(), 3);
        }
    }

    #[tokio::test]
    async fn test_default_order_is_id_descending() {
        let store = store();
        for n in 1..=3 {
            seed_user(&store, n, &[]).await;
        }

        let response = app(&store).oneshot(xhr_get(BASE)).await.unwrap();
        let json = read_json(response).await;
        let ids: Vec<i64> = json["data"]["users"]["users"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_unknown_sort_field_falls_back_to_id() {
        let store = store();
        for n in 1..=3 {
            seed_user(&store, n, &[]).await;
        }

        let uri = format!("{}?sortField=password&sortOrder=ascend", BASE);
        let json = read_json(app(&store).oneshot(xhr_get(&uri)).await.unwrap()).await;
        let ids: Vec<i64> = json["data"]["users"]["users"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_page_size_zero_uses_default() {
        let store = store();
        for n in 1..=4 {
            seed_user(&store, n, &[]).await;
        }
        let state = state(&store).with_paging(PagingLimits { default_page_size: 3, max_page_size: 10 });
        let app = app_with(state);

        let uri = format!("{}?pageSize=0", BASE);
        let json = read_json(app.clone().oneshot(xhr_get(&uri)).await.unwrap()).await;
        assert_eq!(json["data"]["users"]["users"].as_array().unwrap().len(), 3);
        assert_eq!(json["data"]["user"]["total"], 4);

        let uri = format!("{}?pageSize=500", BASE);
        let json = read_json(app.oneshot(xhr_get(&uri)).await.unwrap()).await;
        assert_eq!(json["data"]["users"]["users"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_plain_request_renders_page_shell() {
        let store = store();
        let response = app(&store).oneshot(get(BASE)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
        assert!(content_type.starts_with("text/html"));

        let html = read_text(response).await;
        assert!(html.contains("users-table"));
        assert!(html.contains("New user"));
    }
}

mod store_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_form_lists_roles_descending() {
        let store = store();
        let response = app(&store).oneshot(get(&format!("{}/create", BASE))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = read_text(response).await;
        let roles: Vec<i64> = json_island(&html, "roles")
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["value"].as_i64().unwrap())
            .collect();
        assert_eq!(roles, vec![5, 4, 3, 2, 1]);
        assert_eq!(json_island(&html, "user-roles"), serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_store_assigns_submitted_roles() {
        let store = store();
        let body = "name=Ada&email=ada%40example.com&password=password123\
                    &password_confirmation=password123&assignees_roles=2&assignees_roles=5";

        let response = app(&store).oneshot(form_request(BASE, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), BASE);
        assert!(flash_cookie(&response).is_none());

        assert_eq!(role_ids_of(&store, "ada@example.com"), vec![2, 5]);
    }

    #[tokio::test]
    async fn test_store_accepts_bracketed_role_field() {
        let store = store();
        let body = "name=Ada&email=ada%40example.com&password=password123\
                    &password_confirmation=password123&assignees_roles%5B%5D=3&assignees_roles%5B%5D=3";

        let response = app(&store).oneshot(form_request(BASE, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(role_ids_of(&store, "ada@example.com"), vec![3]);
    }

    #[tokio::test]
    async fn test_store_failure_redirects_back_with_flash() {
        let store = store();
        let referer = "http://localhost/admin/auth/user/create";
        let request = Request::builder()
            .method("POST")
            .uri(BASE)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::REFERER, referer)
            .body(Body::from(
                "name=Ada&email=ada%40example.com&password=password123&password_confirmation=mismatch",
            ))
            .unwrap();

        let response = app(&store).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), referer);

        let cookie = flash_cookie(&response).expect("flash cookie");
        let flash = decode_flash(&cookie);
        assert_eq!(flash["level"], "error");
        assert_eq!(flash["message"], "Save failed!");
        assert_eq!(flash["old_input"]["name"], "Ada");
        assert_eq!(flash["old_input"]["email"], "ada@example.com");
        assert!(flash["old_input"].get("password").is_none());

        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_without_referer_returns_to_form() {
        let store = store();
        seed_user(&store, 1, &[]).await;
        let app = app(&store);

        // duplicate email
        let body = "name=Copy&email=user1%40example.com&password=password123&password_confirmation=password123";
        let response = app.clone().oneshot(form_request(BASE, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), format!("{}/create", BASE));
        let cookie = flash_cookie(&response).expect("flash cookie");

        let request = Request::builder()
            .uri(format!("{}/create", BASE))
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cleared = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .any(|v| v.to_str().unwrap().starts_with("roster_flash=;"));
        assert!(cleared);

        let html = read_text(response).await;
        assert!(html.contains("Save failed!"));
        assert!(html.contains("value=\"Copy\""));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_store_unknown_role_fails() {
        let store = store();
        let body = "name=Ada&email=ada%40example.com&password=password123\
                    &password_confirmation=password123&assignees_roles=2&assignees_roles=99";

        let response = app(&store).oneshot(form_request(BASE, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(flash_cookie(&response).is_some());
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn test_save_failed_message_is_localized() {
        let store = store();
        let state = state(&store).with_translator(Translator::new(Locale::ZhCn));
        let body = "name=Ada&email=bad&password=password123&password_confirmation=password123";

        let response = app_with(state).oneshot(form_request(BASE, body)).await.unwrap();
        let flash = decode_flash(&flash_cookie(&response).expect("flash cookie"));
        assert_eq!(flash["message"], "保存失败！");
    }
}

mod edit_tests {
    use super::*;

    #[tokio::test]
    async fn test_edit_form_shows_assigned_roles() {
        let store = store();
        let id = seed_user(&store, 1, &[5, 2]).await;

        let response = app(&store).oneshot(get(&format!("{}/{}/edit", BASE, id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = read_text(response).await;
        let assigned: HashSet<i64> = json_island(&html, "user-roles")
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect();
        assert_eq!(assigned, HashSet::from([2, 5]));

        let roles: Vec<i64> = json_island(&html, "roles")
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["value"].as_i64().unwrap())
            .collect();
        assert_eq!(roles, vec![5, 4, 3, 2, 1]);

        let user = json_island(&html, "user");
        assert_eq!(user["email"], "user1@example.com");
        assert!(user.get("password").is_none());
    }

    #[tokio::test]
    async fn test_edit_form_missing_user_is_404() {
        let store = store();
        let response = app(&store).oneshot(get(&format!("{}/42/edit", BASE))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

mod update_tests {
    use super::*;

    #[tokio::test]
    async fn test_update_replaces_roles() {
        let store = store();
        let id = seed_user(&store, 1, &[2, 5]).await;

        let request = json_request(
            "PUT",
            &format!("{}/{}", BASE, id),
            serde_json::json!({ "name": "Renamed", "assignees_roles": [3] }),
        );
        let response = app(&store).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, serde_json::json!({ "status": 200, "message": "ok" }));

        let user = store.find_user_by_email("user1@example.com").unwrap();
        assert_eq!(user.role_ids, vec![3]);
        assert_eq!(user.name, "Renamed");
    }

    #[tokio::test]
    async fn test_update_without_roles_clears_them() {
        let store = store();
        let id = seed_user(&store, 1, &[2, 5]).await;

        let request = json_request("PUT", &format!("{}/{}", BASE, id), serde_json::json!({ "name": "Ada" }));
        let response = app(&store).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(role_ids_of(&store, "user1@example.com").is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_user_is_400() {
        let store = store();
        let request = json_request("PUT", &format!("{}/42", BASE), serde_json::json!({ "assignees_roles": [1] }));

        let response = app(&store).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = read_json(response).await;
        assert_eq!(json["status"], 400);
        assert!(!json["message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_unreadable_body_is_400() {
        let store = store();
        let id = seed_user(&store, 1, &[2]).await;
        let request = Request::builder()
            .method("PUT")
            .uri(format!("{}/{}", BASE, id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app(&store).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["status"], 400);
        assert_eq!(role_ids_of(&store, "user1@example.com"), vec![2]);
    }

    #[tokio::test]
    async fn test_update_repository_failure_is_400() {
        let store = store();
        let state = roster_admin::UsersState::new(Arc::new(FailingUsers), store.clone(), store.clone());

        let request = json_request("PUT", &format!("{}/1", BASE), serde_json::json!({ "assignees_roles": [] }));
        let response = app_with(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = read_json(response).await;
        assert_eq!(json["status"], 400);
        assert!(json["message"].as_str().unwrap().contains("database unavailable"));
    }
}

mod password_tests {
    use super::*;

    #[tokio::test]
    async fn test_change_password_form() {
        let store = store();
        let id = seed_user(&store, 1, &[]).await;

        let response = app(&store).oneshot(get(&format!("{}/{}/password", BASE, id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = read_text(response).await;
        assert!(html.contains("user1@example.com"));
        assert!(!html.contains("$argon2id$"));

        let response = app(&store).oneshot(get(&format!("{}/42/password", BASE))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_password_redirects_with_notice() {
        let store = store();
        let id = seed_user(&store, 1, &[]).await;
        let before = store.find_user_by_email("user1@example.com").unwrap().password;

        let body = "password=new-password-1&password_confirmation=new-password-1";
        let response = app(&store)
            .oneshot(form_request(&format!("{}/{}/password", BASE, id), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), BASE);

        let flash = decode_flash(&flash_cookie(&response).expect("flash cookie"));
        assert_eq!(flash["level"], "success");
        assert_eq!(flash["message"], "Password updated.");

        let after = store.find_user_by_email("user1@example.com").unwrap().password;
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_update_password_errors_propagate() {
        let store = store();
        let id = seed_user(&store, 1, &[]).await;
        let app = app(&store);

        let body = "password=new-password-1&password_confirmation=other-password";
        let response = app
            .clone()
            .oneshot(form_request(&format!("{}/{}/password", BASE, id), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"], "VALIDATION_ERROR");

        let body = "password=short&password_confirmation=short";
        let response = app
            .clone()
            .oneshot(form_request(&format!("{}/{}/password", BASE, id), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = "password=new-password-1&password_confirmation=new-password-1";
        let response = app
            .oneshot(form_request(&format!("{}/42/password", BASE), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

mod destroy_tests {
    use super::*;

    fn delete(uri: &str) -> Request<Body> {
        Request::builder().method("DELETE").uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_destroy_existing_user() {
        let store = store();
        let id = seed_user(&store, 1, &[1]).await;

        let response = app(&store).oneshot(delete(&format!("{}/{}", BASE, id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, serde_json::json!({ "message": "ok" }));

        let err = store.find(id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_destroy_missing_user() {
        let store = store();
        seed_user(&store, 1, &[]).await;

        let response = app(&store).oneshot(delete(&format!("{}/42", BASE))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = read_json(response).await;
        assert!(!json["error"].as_str().unwrap().is_empty());
        assert!(json.get("message").is_none());
        assert_eq!(store.user_count(), 1);
    }
}

/// Every call fails as if the database were down.
struct FailingUsers;

#[async_trait]
impl UserRepository for FailingUsers {
    async fn paginate(&self, _page: PageRequest, _sort: UserSort) -> roster_admin::Result<Page<UserWithRoles>> {
        Err(AdminError::internal("database unavailable"))
    }

    async fn find(&self, _id: i64) -> roster_admin::Result<UserWithRoles> {
        Err(AdminError::internal("database unavailable"))
    }

    async fn create(&self, _user: NewUser, _role_ids: &[i64]) -> roster_admin::Result<User> {
        Err(AdminError::internal("database unavailable"))
    }

    async fn update(&self, _id: i64, _changes: UserChanges, _role_ids: &[i64]) -> roster_admin::Result<User> {
        Err(AdminError::internal("database unavailable"))
    }

    async fn update_password(&self, _id: i64, _password: &str) -> roster_admin::Result<()> {
        Err(AdminError::internal("database unavailable"))
    }

    async fn destroy(&self, _id: i64) -> roster_admin::Result<()> {
        Err(AdminError::internal("database unavailable"))
    }
}
