// crates.io
use httpmock::{Mock, prelude::*};
// self
use powerwall_reserve::{
	_preludet::*,
	auth::{format_instant, parse_instant},
	flows::{Scheduler, apply::MISSING_CREDENTIALS},
	store::{CredentialStore, MemoryStore, ParameterStore, StoreError, StoreFuture},
};

const SITE: &str = "/api/1/energy_sites/12345";

struct UnreachableStore;
impl CredentialStore for UnreachableStore {
	fn get<'a>(&'a self, _name: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async {
			Err(StoreError::Backend { message: "parameter service unreachable".into() })
		})
	}

	fn put<'a>(&'a self, _name: &'a str, _value: String, _encrypt: bool) -> StoreFuture<'a, ()> {
		Box::pin(async {
			Err(StoreError::Backend { message: "parameter service unreachable".into() })
		})
	}
}

struct DeviceMocks<'a> {
	products: Mock<'a>,
	info: Mock<'a>,
	backup: Mock<'a>,
	live: Mock<'a>,
}

async fn mock_device<'a>(
	server: &'a MockServer,
	bearer: &str,
	backup_status: u16,
) -> DeviceMocks<'a> {
	let authorization = format!("Bearer {bearer}");
	let products = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/1/products").header("authorization", &authorization);
			then.status(200).json_body(json!({
				"response": [
					{ "id": 1, "vin": "5YJ3E1EA7KF000000" },
					{
						"device_type": "energy",
						"resource_type": "battery",
						"energy_site_id": 12345,
					},
				],
			}));
		})
		.await;
	let info = server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{SITE}/site_info"));
			then.status(200).json_body(json!({ "response": { "backup_reserve_percent": 20 } }));
		})
		.await;
	let backup = server
		.mock_async(|when, then| {
			when.method(POST).path(format!("{SITE}/backup"));
			then.status(backup_status)
				.json_body(json!({ "response": { "code": 201, "message": "Updated" } }));
		})
		.await;
	let live = server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{SITE}/live_status"));
			then.status(200).json_body(json!({
				"response": {
					"percentage_charged": 42,
					"battery_power": -3000,
					"solar_power": 0,
					"load_power": 450,
				},
			}));
		})
		.await;

	DeviceMocks { products, info, backup, live }
}

fn store_with_chat(server: &MockServer) -> MemoryStore {
	let store = seeded_store();

	store.insert("discord_webhook", server.url("/webhook"), true);

	store
}

fn event(percent: i64, name: &str) -> Value {
	json!({ "backup_reserve_percent": percent, "schedule_name": name })
}

#[tokio::test]
async fn setpoint_is_applied_and_reported_with_telemetry() {
	let server = MockServer::start_async().await;
	let device = mock_device(&server, ACCESS_TOKEN, 200).await;
	let push = server
		.mock_async(|when, then| {
			when.method(POST).path("/1/messages.json").body_includes("token=app-token");
			then.status(200).json_body(json!({ "status": 1 }));
		})
		.await;
	let chat = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/webhook")
				.body_includes("\"title\":\"✅ Tesla Powerwall Updated\"")
				.body_includes("Backup reserve changed: 20% → 100%")
				.body_includes("Battery Power: -3000W (charging)");
			then.status(204);
		})
		.await;
	let store = store_with_chat(&server);

	store.insert("pushover_token", "app-token", true);
	store.insert("pushover_user", "user-key", true);

	let scheduler = build_test_scheduler(&server.base_url(), &store);
	let result = scheduler.apply_schedule(&event(100, "11:31 PM - Set to 100%")).await;

	assert_eq!(result.status_code, 200);
	assert_eq!(result.body["message"], "Successfully set backup reserve to 100%");
	assert_eq!(result.body["site_id"], "12345");
	assert_eq!(result.body["backup_reserve"], 100);
	assert_eq!(result.body["schedule_name"], "11:31 PM - Set to 100%");
	assert_eq!(result.body["old_reserve"], 20);
	assert!(
		result.body["timestamp"].as_str().is_some_and(|raw| parse_instant(raw).is_ok()),
		"Timestamp should be an ISO-8601 instant."
	);

	device.products.assert_async().await;
	device.info.assert_async().await;
	device.backup.assert_async().await;
	device.live.assert_calls_async(1).await;
	push.assert_async().await;
	chat.assert_async().await;
}

#[tokio::test]
async fn missing_battery_is_a_404_with_a_plain_failure_report() {
	let server = MockServer::start_async().await;
	let products = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/1/products");
			then.status(200).json_body(json!({ "response": [{ "id": 1, "vin": "5YJ3" }] }));
		})
		.await;
	let live = server
		.mock_async(|when, then| {
			when.method(GET).path(format!("{SITE}/live_status"));
			then.status(200);
		})
		.await;
	let chat = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/webhook")
				.body_includes("\"title\":\"❌ Tesla Powerwall Error\"")
				.body_includes("No Powerwall found for Night charge")
				.body_includes("\"color\":16711680");
			then.status(204);
		})
		.await;
	let scheduler = build_test_scheduler(&server.base_url(), &store_with_chat(&server));
	let result = scheduler.apply_schedule(&event(100, "Night charge")).await;

	assert_eq!(result.status_code, 404);
	assert_eq!(result.body, json!({ "error": "No Powerwall found" }));

	products.assert_async().await;
	chat.assert_async().await;
	live.assert_calls_async(0).await;
}

#[tokio::test]
async fn rejected_write_is_a_500_without_telemetry() {
	let server = MockServer::start_async().await;
	let device = mock_device(&server, ACCESS_TOKEN, 500).await;
	let chat = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/webhook")
				.body_includes("Failed to execute 5:29 AM - Set to 0%.")
				.body_includes("Could not set backup reserve to 0%.");
			then.status(204);
		})
		.await;
	let scheduler = build_test_scheduler(&server.base_url(), &store_with_chat(&server));
	let result = scheduler.apply_schedule(&event(0, "5:29 AM - Set to 0%")).await;

	assert_eq!(result.status_code, 500);
	assert_eq!(
		result.body,
		json!({ "error": "Failed to set backup reserve to 0% (5:29 AM - Set to 0%)" })
	);

	device.backup.assert_async().await;
	device.live.assert_calls_async(0).await;
	chat.assert_async().await;
}

#[tokio::test]
async fn malformed_payloads_are_rejected_before_any_io() {
	let server = MockServer::start_async().await;
	let any = server
		.mock_async(|when, then| {
			when.any_request();
			then.status(200);
		})
		.await;
	let scheduler = build_test_scheduler(&server.base_url(), &store_with_chat(&server));
	let non_integer = scheduler
		.apply_schedule(&json!({ "backup_reserve_percent": "abc", "schedule_name": "x" }))
		.await;
	let missing = scheduler.apply_schedule(&json!({ "schedule_name": "x" })).await;
	let out_of_range = scheduler.apply_schedule(&event(150, "x")).await;

	assert_eq!(non_integer.status_code, 400);
	assert_eq!(non_integer.body["error"], "backup_reserve_percent must be an integer");
	assert_eq!(missing.status_code, 400);
	assert_eq!(missing.body["error"], "backup_reserve_percent required in event");
	assert_eq!(out_of_range.status_code, 400);

	any.assert_calls_async(0).await;
}

#[tokio::test]
async fn incomplete_credentials_fail_without_notifying() {
	let server = MockServer::start_async().await;
	let any = server
		.mock_async(|when, then| {
			when.any_request();
			then.status(200);
		})
		.await;
	let store = MemoryStore::with_parameters([
		("client_id", CLIENT_ID),
		("client_secret", CLIENT_SECRET),
		("access_token", ACCESS_TOKEN),
		("discord_webhook", server.url("/webhook").as_str()),
	]);
	let scheduler = build_test_scheduler(&server.base_url(), &store);
	let result = scheduler.apply_schedule(&event(100, "x")).await;

	assert_eq!(result.status_code, 500);
	assert_eq!(result.body, json!({ "error": MISSING_CREDENTIALS }));

	any.assert_calls_async(0).await;
}

#[tokio::test]
async fn stale_tokens_are_refreshed_before_the_device_call() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v3/token").body_includes("refresh_token=refresh-old");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"access_token": "access-new",
				"refresh_token": "refresh-new",
				"expires_in": 28800,
			}));
		})
		.await;
	let device = mock_device(&server, "access-new", 200).await;
	let store = seeded_store();
	let last = OffsetDateTime::now_utc() - Duration::hours(9);

	store.insert("last_token_refresh", format_instant(last), false);

	let result =
		build_test_scheduler(&server.base_url(), &store).apply_schedule(&event(100, "x")).await;

	assert_eq!(result.status_code, 200);

	token.assert_async().await;
	device.products.assert_async().await;

	assert_eq!(store.value("access_token").as_deref(), Some("access-new"));
	assert_eq!(store.value("refresh_token").as_deref(), Some("refresh-new"));

	let stamp = store.entry("last_token_refresh").expect("Refresh should be stamped.");

	assert!(!stamp.secure);
	assert!(parse_instant(&stamp.value).expect("Stamp should parse.") > last);
}

#[tokio::test]
async fn fresh_or_unreadable_timestamps_skip_the_refresh() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v3/token");
			then.status(500);
		})
		.await;
	let device = mock_device(&server, ACCESS_TOKEN, 200).await;
	let fresh = format_instant(OffsetDateTime::now_utc() - Duration::hours(1));

	for stamp in [fresh.as_str(), "yesterday evening"] {
		let store = seeded_store();

		store.insert("last_token_refresh", stamp, false);

		let result =
			build_test_scheduler(&server.base_url(), &store).apply_schedule(&event(0, "x")).await;

		assert_eq!(result.status_code, 200);
		assert_eq!(store.value("access_token").as_deref(), Some(ACCESS_TOKEN));
		assert_eq!(store.value("last_token_refresh").as_deref(), Some(stamp));
	}

	token.assert_calls_async(0).await;
	device.backup.assert_calls_async(2).await;
}

#[tokio::test]
async fn failed_backup_refresh_falls_back_to_stored_tokens() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/v3/token");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\"}");
		})
		.await;
	let device = mock_device(&server, ACCESS_TOKEN, 200).await;
	let store = seeded_store();

	store.insert(
		"last_token_refresh",
		format_instant(OffsetDateTime::now_utc() - Duration::hours(12)),
		false,
	);

	let result =
		build_test_scheduler(&server.base_url(), &store).apply_schedule(&event(100, "x")).await;

	assert_eq!(result.status_code, 200);

	token.assert_async().await;
	device.products.assert_async().await;

	assert_eq!(store.value("refresh_token").as_deref(), Some(REFRESH_TOKEN));
}

#[tokio::test]
async fn store_outage_becomes_an_execution_failure() {
	let server = MockServer::start_async().await;
	let scheduler = Scheduler::new(
		ParameterStore::new(Arc::new(UnreachableStore)),
		test_config(&server.base_url()),
	)
	.expect("Scheduler should build.");
	let result = scheduler.apply_schedule(&event(100, "x")).await;

	assert_eq!(result.status_code, 500);

	let error = result.body["error"].as_str().expect("Failure body carries an error string.");

	assert!(error.starts_with("Execution failed: "));
	assert!(error.contains("parameter service unreachable"));
}
