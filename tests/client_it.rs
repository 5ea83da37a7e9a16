mod common;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use common::*;
use telemetry_proxy::{
	auth::{Environment, StaticTokenSource, TokenManager},
	client::DataClient,
	error::{Error, UpstreamError},
	model::{CollectQuery, ListFilters, PlanQuery},
	transport::ReqwestTransport,
};

fn client(server: &MockServer, environment: Environment) -> DataClient<ReqwestTransport> {
	let tokens = TokenManager::new(environment, Arc::new(StaticTokenSource::new("unused")))
		.with_token("live-token");

	DataClient::new(Arc::new(tokens), Arc::new(transport(server)))
}

#[tokio::test]
async fn plan_read_forwards_bearer_and_bracketed_lists() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/dep-webapi/data/plan")
				.header("authorization", "Bearer live-token")
				.query_param("from", "2024-01-01T00:00:00+09:00")
				.query_param("to", "2024-01-02T00:00:00+09:00")
				.query_param("intervalType", "1")
				.query_param("resources[]", "r1")
				.query_param("resources[]", "r2");
			then.status(200).json_body(json!({ "plans": [] }));
		})
		.await;
	let query = PlanQuery {
		from: Some("2024-01-01T00:00:00+09:00".into()),
		to: Some("2024-01-02T00:00:00+09:00".into()),
		interval_type: Some(1.into()),
		filters: ListFilters { resources: Some(vec!["r1".into(), "r2".into()]), ..Default::default() },
	};
	let body = client(&server, Environment::Staging)
		.get_plan_data(&query)
		.await
		.expect("Plan read should succeed.");

	assert_eq!(body, json!({ "plans": [] }));

	mock.assert_async().await;
}

#[tokio::test]
async fn dev_calls_carry_no_authorization_header() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/dep-webapi/data/collect").header_missing("authorization");
			then.status(200).json_body(json!([]));
		})
		.await;
	let query = CollectQuery {
		from: Some("2024-01-01T00:00:00+09:00".into()),
		to: Some("2024-01-01T02:00:00+09:00".into()),
		cycle: Some(1.into()),
		..Default::default()
	};

	client(&server, Environment::Dev)
		.get_collect_data(&query)
		.await
		.expect("Dev collect read should succeed.");

	mock.assert_async().await;
}

#[tokio::test]
async fn collect_write_posts_the_original_body() {
	let server = MockServer::start_async().await;
	let body = json!({
		"cycle": 4,
		"dataType1": 5,
		"resources": [{
			"resourceId": "plant-7",
			"attributes": [{
				"attribute": "100200",
				"dataType3": "site-a",
				"values": [
					{ "datetime": stamp_from_now(time::Duration::hours(-3)), "value": "12.5" },
					{ "datetime": stamp_from_now(time::Duration::hours(-2)), "value": "13.0" }
				]
			}]
		}]
	});
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/dep-webapi/data/collect")
				.header("authorization", "Bearer live-token")
				.json_body(body.clone());
			then.status(200).json_body(json!({ "accepted": 2 }));
		})
		.await;
	let response = client(&server, Environment::Production)
		.create_collect_data(body.clone())
		.await
		.expect("Valid writes should be forwarded.");

	assert_eq!(response, json!({ "accepted": 2 }));

	mock.assert_async().await;
}

#[tokio::test]
async fn invalid_write_never_reaches_the_api() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.path("/dep-webapi/data/collect");
			then.status(200);
		})
		.await;
	let body = json!({
		"cycle": 1,
		"resources": [{
			"resourceId": "plant-7",
			"attributes": [{
				"attribute": "12345",
				"values": [{ "datetime": stamp_from_now(time::Duration::ZERO), "value": "1" }]
			}]
		}]
	});
	let err = client(&server, Environment::Staging)
		.create_collect_data(body)
		.await
		.expect_err("Five-digit attribute ids are rejected.");

	assert_eq!(err.to_string(), "attribute must be a 6-digit number string");

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn upstream_statuses_are_classified() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.path("/dep-webapi/data/plan").query_param("intervalType", "0");
			then.status(401).body("token expired");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.path("/dep-webapi/data/plan").query_param("intervalType", "2");
			then.status(503).body("maintenance");
		})
		.await;

	let client = client(&server, Environment::Staging);
	let query = |interval_type: i64| PlanQuery {
		from: Some("2024-01-01T00:00:00+09:00".into()),
		to: Some("2024-01-01T00:00:00+09:00".into()),
		interval_type: Some(interval_type.into()),
		..Default::default()
	};
	let unauthorized =
		client.get_plan_data(&query(0)).await.expect_err("401 should surface as an error.");
	let unavailable =
		client.get_plan_data(&query(2)).await.expect_err("503 should surface as an error.");

	assert!(unauthorized.is_unauthorized());
	assert!(matches!(
		unavailable,
		Error::Upstream(UpstreamError::Status { status: 503, ref body }) if body == "maintenance"
	));
}
