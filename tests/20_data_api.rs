mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn property_hierarchy_round_trip() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Hierarchy Org", "owner@hierarchy.test").await?;

    let suite_id = server.seed_suite(&owner, "Maple Court", "101").await?;
    let (status, body) = server.get(&format!("/api/data/suites/{}", suite_id), &owner.token).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let suite = &body["data"];
    assert_eq!(suite["status"], "vacant");
    assert_eq!(suite["created_by"], owner.user_id.as_str());
    assert!(suite["building_id"].is_string(), "building_id should be copied from the floor: {}", suite);
    assert!(suite.get("organization_id").is_some());

    let (status, body) = server
        .get("/api/data/suites?where=%7B%22status%22%3A%22vacant%22%7D&limit=5", &owner.token)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    Ok(())
}

#[tokio::test]
async fn unknown_collections_and_malformed_ids_are_not_found() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Lookup Org", "owner@lookup.test").await?;

    let (status, _) = server.get("/api/data/spaceships", &owner.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.get("/api/data/users", &owner.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = server.get("/api/data/buildings/not-a-uuid", &owner.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Building not found");

    let missing = uuid::Uuid::new_v4();
    let (status, _) = server.get(&format!("/api/data/buildings/{}", missing), &owner.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn validation_errors_list_each_field() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Validation Org", "owner@validation.test").await?;

    let (status, body) = server.post("/api/data/buildings", &owner.token, json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["name"].is_string());

    let (status, body) = server
        .post(
            "/api/data/tickets",
            &owner.token,
            json!({ "title": "Leaky tap", "priority": "whenever" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["priority"].as_str().is_some_and(|m| m.contains("urgent")));

    let (status, body) = server.post("/api/data/buildings", &owner.token, json!(["not", "an", "object"])).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    Ok(())
}

#[tokio::test]
async fn duplicate_suites_match_numeric_and_string_numbers() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Duplicate Org", "owner@duplicate.test").await?;

    let suite_id = server.seed_suite(&owner, "Birch Plaza", "101").await?;
    let (_, body) = server.get(&format!("/api/data/suites/{}", suite_id), &owner.token).await?;
    let floor_id = body["data"]["floor_id"].as_str().unwrap_or_default().to_string();

    let (status, body) = server
        .post("/api/data/suites", &owner.token, json!({ "floor_id": floor_id, "suite_number": 101 }))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    let (status, _) = server
        .post("/api/data/suites", &owner.token, json!({ "floor_id": floor_id, "suite_number": "102" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = server
        .post("/api/data/buildings", &owner.token, json!({ "name": "birch plaza" }))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn duplicate_floor_numbers_are_rejected_per_building() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Floor Org", "owner@floor.test").await?;

    let building_id = server.create(&owner, "buildings", json!({ "name": "Elm Tower" })).await?;
    server
        .create(&owner, "floors", json!({ "building_id": building_id, "floor_number": 3 }))
        .await?;

    let (status, body) = server
        .post("/api/data/floors", &owner.token, json!({ "building_id": building_id, "floor_number": "3" }))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    server
        .create(&owner, "floors", json!({ "building_id": building_id, "floor_number": 4 }))
        .await?;

    Ok(())
}

#[tokio::test]
async fn parents_with_children_cannot_be_deleted() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Guard Org", "owner@guard.test").await?;

    let suite_id = server.seed_suite(&owner, "Ash Lofts", "1A").await?;
    let (_, body) = server.get(&format!("/api/data/suites/{}", suite_id), &owner.token).await?;
    let floor_id = body["data"]["floor_id"].as_str().unwrap_or_default().to_string();
    let building_id = body["data"]["building_id"].as_str().unwrap_or_default().to_string();

    let building_path = format!("/api/data/buildings/{}", building_id);
    let floor_path = format!("/api/data/floors/{}", floor_id);

    let (status, body) = server.delete(&building_path, &owner.token).await?;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
    assert_eq!(body["message"], "Cannot delete a building that still has floors");

    let (status, body) = server.delete(&floor_path, &owner.token).await?;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
    assert_eq!(body["message"], "Cannot delete a floor that still has suites");

    // Bottom-up deletion succeeds
    for path in [format!("/api/data/suites/{}", suite_id), floor_path, building_path] {
        let (status, body) = server.delete(&path, &owner.token).await?;
        assert_eq!(status, StatusCode::OK, "{}: {}", path, body);
    }

    Ok(())
}

#[tokio::test]
async fn patch_merges_like_put() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Patch Org", "owner@patch.test").await?;

    let tenant_id = server
        .create(&owner, "tenants", json!({ "name": "Oak Bakery", "email": "oak@bakery.test" }))
        .await?;

    let (status, body) = server
        .call(
            reqwest::Method::PATCH,
            &format!("/api/data/tenants/{}", tenant_id),
            Some(&owner.token),
            Some(json!({ "phone": "555-0100" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["phone"], "555-0100");
    assert_eq!(body["data"]["name"], "Oak Bakery");
    assert_eq!(body["data"]["email"], "oak@bakery.test");

    Ok(())
}

#[tokio::test]
async fn negative_paging_is_rejected() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Paging Org", "owner@paging.test").await?;
    server.create(&owner, "tenants", json!({ "name": "Pine Florist" })).await?;

    let (status, body) = server.get("/api/data/tenants?limit=-1", &owner.token).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, body) = server.post("/api/find/tenants", &owner.token, json!({ "limit": -1 })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, body) = server.get("/api/data/tenants?offset=-1", &owner.token).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, body) = server.get("/api/notifications?limit=-1", &owner.token).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, body) = server.get("/api/data/tenants?limit=0", &owner.token).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));

    Ok(())
}

#[tokio::test]
async fn leases_drive_suite_occupancy() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Lease Org", "owner@lease.test").await?;

    let suite_id = server.seed_suite(&owner, "Cedar House", "2A").await?;
    let tenant_id = server.create(&owner, "tenants", json!({ "name": "Acme Dental", "email": "hi@acme.test" })).await?;

    let lease = json!({
        "tenant_id": tenant_id,
        "suite_id": suite_id,
        "start_date": "2026-01-01",
        "end_date": "2026-12-31",
        "monthly_rent": 2400,
    });
    let lease_id = server.create(&owner, "leases", lease).await?;

    let suite_path = format!("/api/data/suites/{}", suite_id);
    let (_, body) = server.get(&suite_path, &owner.token).await?;
    assert_eq!(body["data"]["status"], "occupied");

    // Suites with an active lease cannot be deleted
    let (status, _) = server.delete(&suite_path, &owner.token).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = server
        .put(&format!("/api/data/leases/{}", lease_id), &owner.token, json!({ "status": "ended" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["monthly_rent"], 2400, "update should merge: {}", body);

    let (_, body) = server.get(&suite_path, &owner.token).await?;
    assert_eq!(body["data"]["status"], "vacant");

    Ok(())
}

#[tokio::test]
async fn lease_end_must_follow_start() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Dates Org", "owner@dates.test").await?;

    let suite_id = server.seed_suite(&owner, "Dogwood", "1").await?;
    let tenant_id = server.create(&owner, "tenants", json!({ "name": "Late Co" })).await?;

    let (status, body) = server
        .post(
            "/api/data/leases",
            &owner.token,
            json!({
                "tenant_id": tenant_id,
                "suite_id": suite_id,
                "start_date": "2026-06-01",
                "end_date": "2026-05-01",
                "monthly_rent": 900,
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert!(body["field_errors"]["end_date"].is_string());

    Ok(())
}

#[tokio::test]
async fn payments_inherit_tenant_and_block_lease_delete() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Payment Org", "owner@payment.test").await?;

    let suite_id = server.seed_suite(&owner, "Elm Works", "5").await?;
    let tenant_id = server.create(&owner, "tenants", json!({ "name": "Beta LLC" })).await?;
    let lease_id = server
        .create(
            &owner,
            "leases",
            json!({
                "tenant_id": tenant_id,
                "suite_id": suite_id,
                "start_date": "2026-01-01",
                "end_date": "2027-01-01",
                "monthly_rent": 1500.5,
            }),
        )
        .await?;

    let payment_id = server
        .create(&owner, "payments", json!({ "lease_id": lease_id, "amount": 1500.5, "due_date": "2026-02-01" }))
        .await?;
    let payment_path = format!("/api/data/payments/{}", payment_id);

    let (_, body) = server.get(&payment_path, &owner.token).await?;
    assert_eq!(body["data"]["tenant_id"], tenant_id.as_str());
    assert_eq!(body["data"]["status"], "pending");

    let (status, body) = server.put(&payment_path, &owner.token, json!({ "status": "paid" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["paid_at"].is_string(), "{}", body);

    let (status, _) = server.delete(&format!("/api/data/leases/{}", lease_id), &owner.token).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = server.delete(&payment_path, &owner.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], payment_id.as_str());

    Ok(())
}

#[tokio::test]
async fn find_accepts_a_filter_body() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Find Org", "owner@find.test").await?;

    for name in ["Zed Corp", "Alpha Inc", "Mid Ltd"] {
        server.create(&owner, "tenants", json!({ "name": name })).await?;
    }

    let (status, body) = server
        .post(
            "/api/find/tenants",
            &owner.token,
            json!({ "where": { "name": { "$like": "%Inc%" } }, "order": "name asc" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let (_, body) = server
        .post("/api/find/tenants", &owner.token, json!({ "order": "name asc", "limit": 2 }))
        .await?;
    let names: Vec<&str> = body["data"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|r| r["name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec!["Alpha Inc", "Mid Ltd"]);

    Ok(())
}

#[tokio::test]
async fn tenant_users_see_only_their_own_records() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Scope Org", "owner@scope.test").await?;

    let tenant_id = server.create(&owner, "tenants", json!({ "name": "Gamma Studio" })).await?;
    let other_tenant = server.create(&owner, "tenants", json!({ "name": "Delta Shop" })).await?;
    let renter = server.add_member(&owner, "renter@scope.test", "tenant", Some(&tenant_id)).await?;

    server.create(&owner, "tickets", json!({ "title": "Delta's door", "tenant_id": other_tenant })).await?;

    let (status, body) = server
        .post("/api/data/tickets", &renter.token, json!({ "title": "Broken heater", "tenant_id": other_tenant }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["tenant_id"], tenant_id.as_str(), "tenant id is forced to the caller's");

    let (status, body) = server.get("/api/data/tickets", &renter.token).await?;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["data"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|r| r["title"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(titles, vec!["Broken heater"]);

    let (status, _) = server.get("/api/data/buildings", &renter.token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server.post("/api/data/buildings", &renter.token, json!({ "name": "Nope" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn organizations_are_isolated() -> Result<()> {
    let server = common::spawn_server().await?;
    let first = server.register("First Co", "owner@first.test").await?;
    let second = server.register("Second Co", "owner@second.test").await?;

    let building_id = server.create(&first, "buildings", json!({ "name": "Shared Name" })).await?;

    let (status, _) = server.get(&format!("/api/data/buildings/{}", building_id), &second.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Duplicate names are per organization
    server.create(&second, "buildings", json!({ "name": "Shared Name" })).await?;

    let (_, body) = server.get("/api/data/buildings", &second.token).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_ne!(body["data"][0]["id"], Value::String(building_id));

    Ok(())
}
