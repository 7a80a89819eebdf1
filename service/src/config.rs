use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use sse::SlowSubscriberPolicy;
use std::time::Duration;

/// Default pub/sub backend the bridge subscribes to.
pub const DEFAULT_FEED_ADDRESS: &str = "redis://127.0.0.1:6379";
/// Default channel pattern the bridge subscribes to.
pub const DEFAULT_TOPIC: &str = "foo";

const SLOW_SUBSCRIBER_POLICIES: [&str; 2] = ["block", "disconnect"];

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 8000)]
    pub port: u16,

    /// The path the event stream is served on
    #[arg(long, env, default_value = "/")]
    stream_path: String,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Capacity of the inbound event channel shared by all producers
    #[arg(long, env, default_value_t = 1)]
    pub event_buffer: usize,

    /// Capacity of each subscriber's own delivery channel
    #[arg(long, env, default_value_t = 1)]
    pub subscriber_buffer: usize,

    /// What to do with a subscriber whose delivery channel is full: wait for it
    /// (`block`, holds up everyone else) or drop it (`disconnect`)
    #[arg(
        long,
        env,
        default_value = "block",
        value_parser = clap::builder::PossibleValuesParser::new(SLOW_SUBSCRIBER_POLICIES)
            .try_map(|s| s.parse::<SlowSubscriberPolicy>()),
    )]
    pub slow_subscriber_policy: SlowSubscriberPolicy,

    /// Network endpoint of the publish/subscribe backend
    #[arg(long, env, default_value = DEFAULT_FEED_ADDRESS)]
    feed_address: String,

    /// Channel pattern to subscribe to on the publish/subscribe backend
    #[arg(long, env, default_value = DEFAULT_TOPIC)]
    topic: String,

    /// Do not bridge the publish/subscribe backend into the stream
    #[arg(long, env, default_value_t = false)]
    pub feed_disabled: bool,

    /// Seconds to wait before reconnecting to the publish/subscribe backend
    #[arg(long, env, default_value_t = 5)]
    pub feed_retry_secs: u64,

    /// Seconds between synthetic "the time is ..." events. 0 disables them.
    #[arg(long, env, default_value_t = 0)]
    pub tick_interval_secs: u64,

    /// Publish synthetic events to the backend topic instead of straight to the stream
    #[arg(long, env, default_value_t = false)]
    pub tick_via_feed: bool,
}

impl Default for Config {
    /// Defaults and environment only; command line arguments are ignored.
    fn default() -> Self {
        Config::parse_from([env!("CARGO_PKG_NAME")])
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn interface(&self) -> &str {
        self.interface.as_deref().unwrap_or("127.0.0.1")
    }

    pub fn stream_path(&self) -> &str {
        &self.stream_path
    }

    pub fn set_stream_path(mut self, stream_path: impl Into<String>) -> Self {
        self.stream_path = stream_path.into();
        self
    }

    pub fn feed_address(&self) -> &str {
        &self.feed_address
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn feed_retry_delay(&self) -> Duration {
        Duration::from_secs(self.feed_retry_secs)
    }

    /// `None` when synthetic events are disabled.
    pub fn tick_interval(&self) -> Option<Duration> {
        (self.tick_interval_secs > 0).then(|| Duration::from_secs(self.tick_interval_secs))
    }
}
