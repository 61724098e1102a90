//! Browser launch configuration.
//!
//! [`LaunchConfig`] is the user-facing, serde-loadable part; [`LaunchOptions`]
//! is the fully resolved request handed to [`BrowserDriver::launch`].
//!
//! [`BrowserDriver::launch`]: crate::driver::BrowserDriver::launch

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Path the fake video capture device reads from when a video file is configured.
pub const FAKE_VIDEO_CAPTURE_PATH: &str = "/tmp/video.y4m";
/// Path the fake audio capture device reads from when a video file is configured.
pub const FAKE_AUDIO_CAPTURE_PATH: &str = "/tmp/audio.wav";

/// Chromium flags every session browser is started with.
const BASE_ARGS: &[&str] = &[
	"--no-sandbox",
	"--ignore-certificate-errors",
	"--no-user-gesture-required",
	"--autoplay-policy=no-user-gesture-required",
	"--disable-infobars",
	"--enable-precise-memory-info",
	"--ignore-gpu-blacklist",
	"--force-fieldtrials=AutomaticTabDiscarding/Disabled",
];

/// Viewport dimensions for every page in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
	/// Page width in pixels
	pub width: u32,
	/// Page height in pixels
	pub height: u32,
}

impl Default for Viewport {
	fn default() -> Self {
		Self { width: 1920, height: 1080 }
	}
}

/// User-facing browser launch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaunchConfig {
	/// Browser executable; the driver's default when unset.
	pub executable_path: Option<PathBuf>,
	/// Page viewport.
	pub viewport: Viewport,
	/// Ask the browser to use a null video decoder (saves CPU on receivers).
	pub use_null_video_decoder: bool,
	/// Source clip of the run. When set, the browser gets fake capture devices
	/// reading [`FAKE_VIDEO_CAPTURE_PATH`] and [`FAKE_AUDIO_CAPTURE_PATH`], which
	/// must be transcoded from this clip before launch.
	pub video_path: Option<PathBuf>,
	/// Extra flags appended after the built-in ones.
	pub extra_args: Vec<String>,
}

impl Default for LaunchConfig {
	fn default() -> Self {
		Self {
			executable_path: None,
			viewport: Viewport::default(),
			use_null_video_decoder: false,
			video_path: None,
			extra_args: Vec::new(),
		}
	}
}

impl LaunchConfig {
	/// Resolves launch options against the current `DISPLAY` environment.
	pub fn to_options(&self) -> LaunchOptions {
		self.to_options_with_display(std::env::var("DISPLAY").ok())
	}

	/// Resolves launch options for an explicit X display.
	///
	/// The browser runs headless exactly when there is no display.
	pub fn to_options_with_display(&self, display: Option<String>) -> LaunchOptions {
		let display = display.filter(|d| !d.is_empty());

		let mut env = BTreeMap::new();
		if let Some(display) = &display {
			env.insert("DISPLAY".to_string(), display.clone());
		}
		if self.use_null_video_decoder {
			env.insert("USE_NULL_VIDEO_DECODER".to_string(), "1".to_string());
		}

		let mut args: Vec<String> = BASE_ARGS.iter().map(|a| a.to_string()).collect();
		if self.video_path.is_some() {
			args.push("--use-fake-ui-for-media-stream".to_string());
			args.push("--use-fake-device-for-media-stream".to_string());
			args.push(format!("--use-file-for-fake-video-capture={FAKE_VIDEO_CAPTURE_PATH}"));
			args.push(format!("--use-file-for-fake-audio-capture={FAKE_AUDIO_CAPTURE_PATH}"));
		}
		args.extend(self.extra_args.iter().cloned());

		LaunchOptions {
			headless: display.is_none(),
			executable_path: self.executable_path.clone(),
			ignore_https_errors: true,
			viewport: self.viewport,
			env,
			args,
		}
	}
}

/// Fully resolved browser launch request.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOptions {
	pub headless: bool,
	pub executable_path: Option<PathBuf>,
	pub ignore_https_errors: bool,
	pub viewport: Viewport,
	/// Environment of the browser process.
	pub env: BTreeMap<String, String>,
	/// Command-line flags of the browser process.
	pub args: Vec<String>,
}
