//! `plan`: what a run would do, without launching anything.

use std::collections::BTreeMap;

use rtcswarm::SwarmConfig;
use serde::Serialize;

use crate::cli::PlanArgs;
use crate::error::Result;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanData {
	pub launch: LaunchPlan,
	pub sessions: Vec<SessionPlan>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchPlan {
	pub headless: bool,
	pub args: Vec<String>,
	pub env: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPlan {
	/// 1-based, as substituted for `$s`.
	pub session: usize,
	pub tabs: Vec<TabPlan>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabPlan {
	/// 1-based, as substituted for `$t`.
	pub tab: usize,
	/// Offset from session start at which the tab is first opened.
	pub open_at_ms: u128,
	pub url: String,
}

pub fn execute(args: &PlanArgs, mut config: SwarmConfig) -> Result<PlanData> {
	apply_overrides(args, &mut config);
	config.validate()?;
	Ok(build_plan(&config, std::process::id()))
}

fn apply_overrides(args: &PlanArgs, config: &mut SwarmConfig) {
	if let Some(url) = &args.url {
		config.url = url.clone();
	}
	if let Some(query) = &args.url_query {
		config.url_query = Some(query.clone());
	}
	if let Some(sessions) = args.sessions {
		config.sessions = sessions;
	}
	if let Some(tabs) = args.tabs_per_session {
		config.tabs_per_session = tabs;
	}
	if let Some(period) = args.spawn_period_ms {
		config.spawn_period_ms = period;
	}
}

fn build_plan(config: &SwarmConfig, pid: u32) -> PlanData {
	let options = config.launch.to_options();
	let sessions = (0..config.sessions)
		.map(|session| SessionPlan {
			session: session + 1,
			tabs: (0..config.tabs_per_session)
				.map(|tab| TabPlan {
					tab: tab + 1,
					open_at_ms: config.stagger_delay(tab).as_millis(),
					url: config.tab_url(session, tab, pid),
				})
				.collect(),
		})
		.collect();

	PlanData {
		launch: LaunchPlan {
			headless: options.headless,
			args: options.args,
			env: options.env,
		},
		sessions,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tabs_are_staggered_and_templated() {
		let config = SwarmConfig {
			url: "https://meet.example.com/room".into(),
			url_query: Some("user=$s.$t&of=$S.$T&pid=$p".into()),
			sessions: 2,
			tabs_per_session: 3,
			spawn_period_ms: 1000,
			..SwarmConfig::default()
		};

		let plan = build_plan(&config, 77);
		assert_eq!(plan.sessions.len(), 2);

		let offsets: Vec<_> = plan.sessions[0].tabs.iter().map(|tab| tab.open_at_ms).collect();
		assert_eq!(offsets, vec![0, 1000, 2000]);

		let last = &plan.sessions[1].tabs[2];
		assert_eq!(plan.sessions[1].session, 2);
		assert_eq!(last.tab, 3);
		assert_eq!(last.url, "https://meet.example.com/room?user=2.3&of=2.3&pid=77");
	}

	#[test]
	fn overrides_replace_config_values() {
		let args = PlanArgs {
			url: Some("https://sfu.example.net".into()),
			tabs_per_session: Some(5),
			spawn_period_ms: Some(250),
			..PlanArgs::default()
		};

		let plan = execute(&args, SwarmConfig::default()).unwrap();
		let tabs = &plan.sessions[0].tabs;
		assert_eq!(tabs.len(), 5);
		assert_eq!(tabs[4].open_at_ms, 1000);
		assert_eq!(tabs[0].url, "https://sfu.example.net");
	}

	#[test]
	fn invalid_override_is_rejected() {
		let args = PlanArgs {
			tabs_per_session: Some(0),
			..PlanArgs::default()
		};
		assert!(execute(&args, SwarmConfig::default()).is_err());
	}
}
