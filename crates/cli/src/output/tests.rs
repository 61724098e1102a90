use serde_json::json;

use super::*;

#[test]
fn success_envelope_omits_error() {
	let result = CommandResult::success("plan", json!({ "tabs": 2 }));
	let value = serde_json::to_value(&result).unwrap();

	assert_eq!(value["schemaVersion"], SCHEMA_VERSION);
	assert_eq!(value["ok"], true);
	assert_eq!(value["command"], "plan");
	assert_eq!(value["data"]["tabs"], 2);
	assert!(value.get("error").is_none());
}

#[test]
fn failure_envelope_carries_code() {
	let result: CommandResult<()> = CommandResult::failure(
		"replay",
		CommandError {
			code: ErrorCode::InvalidInput,
			message: "bad line".into(),
		},
	);
	let value = serde_json::to_value(&result).unwrap();

	assert_eq!(value["ok"], false);
	assert_eq!(value["error"]["code"], "INVALID_INPUT");
	assert!(value.get("data").is_none());
}

#[test]
fn error_code_display_matches_wire_name() {
	for code in [
		ErrorCode::ConfigError,
		ErrorCode::InvalidInput,
		ErrorCode::IoError,
		ErrorCode::SessionError,
		ErrorCode::InternalError,
	] {
		assert_eq!(serde_json::to_value(code).unwrap(), json!(code.to_string()));
	}
}
