#[cfg(test)]
mod integration_tests {
    use crate::handlers::admin::ActionRequest;
    use crate::handlers::users::{CreateUserRequest, UpdateUserRequest};
    use crate::schemas::ApiResponse;
    use crate::test_utils::test_utils::{
        init_test_tracing, seed_user, setup_test_app, setup_test_app_with_state,
    };
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use model::entities::user::{self, UserType};
    use sea_orm::EntityTrait;
    use serde_json::json;

    fn registration(username: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            password: "correct horse battery".to_string(),
            email: Some(format!("{}@example.com", username.to_lowercase())),
            first_name: None,
            last_name: None,
            phone_number: None,
            user_type: None,
            license_number: None,
            agency_name: None,
            years_experience: None,
            bio: None,
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/health").await;

        response.assert_status(StatusCode::OK);
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_create_user() {
        let _guard = init_test_tracing();
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/users")
            .json(&registration("NewBuyer"))
            .await;

        if response.status_code() != StatusCode::CREATED {
            println!("Error response: {}", response.text());
            panic!("Expected 201 Created, got {}", response.status_code());
        }
        let body: ApiResponse<serde_json::Value> = response.json();
        assert!(body.success);
        assert_eq!(body.message, "User created successfully");

        let user_data = &body.data;
        assert_eq!(user_data["username"], "newbuyer");
        assert_eq!(user_data["user_type"], "buyer");
        assert_eq!(user_data["is_verified"], false);
        assert_eq!(user_data["is_active"], true);
        assert_eq!(user_data["years_experience"], 0);
        assert!(user_data.get("password").is_none());
        assert!(user_data["id"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_create_user_stores_hashed_password() {
        let (app, state) = setup_test_app_with_state().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/users")
            .json(&registration("hashme"))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        let id = body.data["id"].as_i64().unwrap() as i32;

        let stored = user::Entity::find_by_id(id).one(&state.db).await.unwrap().unwrap();
        assert_ne!(stored.password, "correct horse battery");
        assert!(model::password::verify_password("correct horse battery", &stored.password).unwrap());
    }

    #[tokio::test]
    async fn test_create_agent_with_profile() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let mut request = registration("agent_smith");
        request.user_type = Some(UserType::Agent);
        request.first_name = Some("John".to_string());
        request.last_name = Some("Smith".to_string());
        request.license_number = Some("LIC-001".to_string());
        request.agency_name = Some("Acme Realty".to_string());
        request.years_experience = Some(7);

        let response = server.post("/api/v1/users").json(&request).await;

        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["user_type"], "agent");
        assert_eq!(body.data["full_name"], "John Smith");
        assert_eq!(body.data["is_approved_agent"], false);
        assert_eq!(body.data["years_experience"], 7);
    }

    #[tokio::test]
    async fn test_create_user_rejects_admin_role() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let mut request = registration("sneaky");
        request.user_type = Some(UserType::Admin);

        let response = server.post("/api/v1/users").json(&request).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "ROLE_NOT_ALLOWED");
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_create_user_rejects_short_password() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let mut request = registration("shorty");
        request.password = "short".to_string();

        let response = server.post("/api/v1/users").json(&request).await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_user_duplicate_username_ignores_case() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        server
            .post("/api/v1/users")
            .json(&registration("duplicate"))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .post("/api/v1/users")
            .json(&registration("DUPLICATE"))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "USERNAME_ALREADY_EXISTS");
    }

    #[tokio::test]
    async fn test_get_users() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/api/v1/users").await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<serde_json::Value>> = response.json();
        assert!(body.success);
        assert_eq!(body.message, "Users retrieved successfully");
        assert!(body.data.iter().any(|u| u["username"] == "test_buyer"));
        assert!(body.data.iter().any(|u| u["username"] == "test_agent"));
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/api/v1/users/99999").await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "USER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_update_user_profile() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let create_response = server
            .post("/api/v1/users")
            .json(&registration("profile_owner"))
            .await;
        let create_body: ApiResponse<serde_json::Value> = create_response.json();
        let user_id = create_body.data["id"].as_i64().unwrap();
        let date_joined = create_body.data["date_joined"].clone();

        let update_request = UpdateUserRequest {
            first_name: Some("Ada".to_string()),
            profile_picture: Some("avatar.png".to_string()),
            bio: Some("Looking for a flat".to_string()),
            ..Default::default()
        };
        let response = server
            .put(&format!("/api/v1/users/{}", user_id))
            .json(&update_request)
            .await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.message, "User updated successfully");
        assert_eq!(body.data["first_name"], "Ada");
        assert_eq!(body.data["bio"], "Looking for a flat");
        assert_eq!(body.data["date_joined"], date_joined);
        let picture = body.data["profile_picture"].as_str().unwrap();
        assert!(picture.starts_with("profile_pics/"));
        assert!(picture.ends_with("/avatar.png"));
    }

    #[tokio::test]
    async fn test_update_user_not_found() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .put("/api/v1/users/99999")
            .json(&UpdateUserRequest {
                first_name: Some("Nobody".to_string()),
                ..Default::default()
            })
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_user() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let create_response = server
            .post("/api/v1/users")
            .json(&registration("leaving"))
            .await;
        let create_body: ApiResponse<serde_json::Value> = create_response.json();
        let user_id = create_body.data["id"].as_i64().unwrap();

        server
            .delete(&format!("/api/v1/users/{}", user_id))
            .await
            .assert_status(StatusCode::OK);

        server
            .get(&format!("/api/v1/users/{}", user_id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .delete(&format!("/api/v1/users/{}", user_id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_config() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/api/v1/admin/users/config").await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        let config = &body.data;
        assert_eq!(config["list_per_page"], 100);
        assert_eq!(config["ordering"], json!(["-date_joined"]));
        assert_eq!(config["readonly_fields"], json!(["date_joined", "updated_at"]));
        assert_eq!(
            config["list_filter"],
            json!(["user_type", "is_verified", "is_active", "is_staff", "date_joined"])
        );
        assert_eq!(config["fieldsets"][3]["name"], "Agent Information");
        assert_eq!(config["fieldsets"][3]["classes"], json!(["collapse"]));
        assert_eq!(config["user_type_choices"][1]["label"], "Real Estate Agent");
    }

    #[tokio::test]
    async fn test_change_list_filters_and_facets() {
        let (app, state) = setup_test_app_with_state().await;
        seed_user(&state.db, "approved_agent", UserType::Agent, true).await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .get("/api/v1/admin/users")
            .add_query_param("user_type", "agent")
            .add_query_param("is_verified", "false")
            .await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["count"], 1);
        assert_eq!(body.data["results"][0]["username"], "test_agent");
        assert_eq!(body.data["page"], 1);
        assert_eq!(body.data["per_page"], 100);

        let facets = body.data["facets"].as_array().unwrap();
        let agents = facets.iter().find(|f| f["user_type"] == "agent").unwrap();
        assert_eq!(agents["count"], 2);
        assert_eq!(agents["label"], "Real Estate Agent");
    }

    #[tokio::test]
    async fn test_change_list_search_and_ordering() {
        let (app, state) = setup_test_app_with_state().await;
        seed_user(&state.db, "zeta_agent", UserType::Agent, true).await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .get("/api/v1/admin/users")
            .add_query_param("q", "AGENT")
            .add_query_param("o", "username")
            .await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        let names: Vec<&str> = body.data["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["username"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["test_agent", "zeta_agent"]);
    }

    #[tokio::test]
    async fn test_change_list_rejects_bad_ordering_and_page() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .get("/api/v1/admin/users")
            .add_query_param("o", "password")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "VALIDATION_ERROR");

        server
            .get("/api/v1/admin/users")
            .add_query_param("p", "0")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_change_list_rejects_page_past_the_end() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        for page in ["2", "1844674407370955161", "18446744073709551615"] {
            let response = server
                .get("/api/v1/admin/users")
                .add_query_param("p", page)
                .await;
            response.assert_status(StatusCode::BAD_REQUEST);
            let body: serde_json::Value = response.json();
            assert_eq!(body["code"], "VALIDATION_ERROR");
        }

        // The server keeps answering afterwards
        server
            .get("/api/v1/admin/users")
            .await
            .assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_change_list_search_matches_underscore_literally() {
        let (app, state) = setup_test_app_with_state().await;
        seed_user(&state.db, "testxagent", UserType::Agent, false).await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .get("/api/v1/admin/users")
            .add_query_param("q", "test_agent")
            .await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        let names: Vec<&str> = body.data["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["username"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["test_agent"]);
    }

    #[tokio::test]
    async fn test_change_list_facets_refresh_after_write() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let buyers = |body: &ApiResponse<serde_json::Value>| {
            body.data["facets"]
                .as_array()
                .unwrap()
                .iter()
                .find(|f| f["user_type"] == "buyer")
                .map(|f| f["count"].as_u64().unwrap())
                .unwrap()
        };

        let before: ApiResponse<serde_json::Value> = server.get("/api/v1/admin/users").await.json();
        assert_eq!(buyers(&before), 1);

        server
            .post("/api/v1/users")
            .json(&registration("late_buyer"))
            .await
            .assert_status(StatusCode::CREATED);

        let after: ApiResponse<serde_json::Value> = server.get("/api/v1/admin/users").await.json();
        assert_eq!(buyers(&after), 2);
    }

    #[tokio::test]
    async fn test_admin_add_user() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/admin/users")
            .json(&json!({
                "username": "Console_Admin",
                "email": "root@example.com",
                "password1": "s3cret-pass",
                "password2": "s3cret-pass",
                "user_type": "admin"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["user"]["username"], "console_admin");
        assert_eq!(body.data["user"]["is_verified"], true);
        assert_eq!(body.data["has_usable_password"], true);
        assert_eq!(body.data["readonly_fields"], json!(["date_joined", "updated_at"]));
    }

    #[tokio::test]
    async fn test_admin_add_user_password_mismatch() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/admin/users")
            .json(&json!({
                "username": "mismatch",
                "password1": "first-password",
                "password2": "other-password"
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_admin_change_view_and_promotion() {
        let (app, state) = setup_test_app_with_state().await;
        let buyer = seed_user(&state.db, "promote_me", UserType::Buyer, false).await;
        let server = TestServer::new(app).unwrap();

        let view = server.get(&format!("/api/v1/admin/users/{}", buyer.id)).await;
        view.assert_status(StatusCode::OK);
        let view_body: ApiResponse<serde_json::Value> = view.json();
        assert_eq!(view_body.data["has_usable_password"], false);
        assert_eq!(view_body.data["fieldsets"][2]["name"], "Role and Status");

        let response = server
            .put(&format!("/api/v1/admin/users/{}", buyer.id))
            .json(&json!({ "user_type": "admin", "is_verified": false }))
            .await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["user"]["user_type"], "admin");
        assert_eq!(body.data["user"]["is_verified"], true);
    }

    #[tokio::test]
    async fn test_admin_change_rejects_readonly_field() {
        let (app, state) = setup_test_app_with_state().await;
        let buyer = seed_user(&state.db, "frozen", UserType::Buyer, false).await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .put(&format!("/api/v1/admin/users/{}", buyer.id))
            .json(&json!({ "date_joined": "2020-01-01T00:00:00Z" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "READ_ONLY_FIELD");

        let stored = user::Entity::find_by_id(buyer.id).one(&state.db).await.unwrap().unwrap();
        assert_eq!(stored.date_joined, buyer.date_joined);
    }

    #[tokio::test]
    async fn test_admin_change_view_not_found() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        server
            .get("/api/v1/admin/users/99999")
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .put("/api/v1/admin/users/99999")
            .json(&json!({ "first_name": "Ghost" }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_actions() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/api/v1/admin/actions").await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<serde_json::Value>> = response.json();
        let names: Vec<&str> = body.data.iter().map(|a| a["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["approve_agents", "deactivate_users"]);
        assert_eq!(body.data[0]["description"], "Approve selected agents");
        assert_eq!(body.data[1]["description"], "Deactivate selected users");
    }

    #[tokio::test]
    async fn test_approve_agents_action() {
        let (app, state) = setup_test_app_with_state().await;
        let agent = seed_user(&state.db, "pending_agent", UserType::Agent, false).await;
        let buyer = seed_user(&state.db, "plain_buyer", UserType::Buyer, false).await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/admin/users/actions/approve_agents")
            .json(&ActionRequest { ids: vec![agent.id, buyer.id] })
            .await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["updated"], 1);
        assert_eq!(body.message, "1 agents approved successfully.");

        let agent = user::Entity::find_by_id(agent.id).one(&state.db).await.unwrap().unwrap();
        let buyer = user::Entity::find_by_id(buyer.id).one(&state.db).await.unwrap().unwrap();
        assert!(agent.is_approved_agent());
        assert!(!buyer.is_verified);
    }

    #[tokio::test]
    async fn test_deactivate_users_action() {
        let (app, state) = setup_test_app_with_state().await;
        let first = seed_user(&state.db, "first_out", UserType::Buyer, false).await;
        let second = seed_user(&state.db, "second_out", UserType::Agent, true).await;
        let keeper = seed_user(&state.db, "keeper", UserType::Buyer, false).await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/admin/users/actions/deactivate_users")
            .json(&ActionRequest { ids: vec![first.id, second.id] })
            .await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert_eq!(body.data["updated"], 2);
        assert_eq!(body.message, "2 users deactivated successfully.");

        let inactive = server
            .get("/api/v1/admin/users")
            .add_query_param("is_active", "false")
            .await
            .json::<ApiResponse<serde_json::Value>>();
        assert_eq!(inactive.data["count"], 2);

        let keeper = user::Entity::find_by_id(keeper.id).one(&state.db).await.unwrap().unwrap();
        assert!(keeper.is_active);
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .post("/api/v1/admin/users/actions/delete_everything")
            .json(&ActionRequest { ids: vec![1] })
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "UNKNOWN_ACTION");
    }

    #[tokio::test]
    async fn test_prometheus_metrics_endpoint() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        // Metrics are not mounted in test builds
        let response = server.get("/metrics").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}
