use bridge::{Bridge, FeedConfig, RedisPublisher};
use events::Ticker;
use log::*;
use service::{config::Config, logging::Logger};
use sse::{Broker, BrokerConfig};
use tokio_util::sync::CancellationToken;
use web::AppState;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    info!("Starting up SSE relay...");

    let broker = Broker::new(broker_config(&config));
    let collaborators = CancellationToken::new();

    if config.feed_disabled {
        info!("Feed bridge disabled");
    } else {
        let feed = FeedConfig::new(config.feed_address(), config.topic())
            .with_retry_delay(config.feed_retry_delay());
        let bridge = Bridge::new(feed, broker.clone());
        tokio::spawn(bridge.run(collaborators.child_token()));
    }

    if let Some(period) = config.tick_interval() {
        spawn_ticker(&config, period, &broker, collaborators.child_token());
    }

    let shutdown = {
        let broker = broker.clone();
        let collaborators = collaborators.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {e}");
            }
            info!("Shutdown signal received");
            collaborators.cancel();
            // Ends every open stream, which lets graceful shutdown finish.
            broker.shutdown();
        }
    };

    let app_state = AppState::new(config, broker.clone());
    if let Err(e) = web::init_server(app_state, shutdown).await {
        error!("HTTP server error: {e}");
        collaborators.cancel();
        broker.shutdown();
        std::process::exit(1);
    }
}

fn broker_config(config: &Config) -> BrokerConfig {
    BrokerConfig {
        event_buffer: config.event_buffer,
        subscriber_buffer: config.subscriber_buffer,
        slow_subscriber_policy: config.slow_subscriber_policy,
    }
}

fn spawn_ticker(
    config: &Config,
    period: std::time::Duration,
    broker: &Broker,
    cancel: CancellationToken,
) {
    let ticker = Ticker::new(period);

    if !config.tick_via_feed {
        info!("Publishing synthetic events every {period:?}");
        let broker = broker.clone();
        tokio::spawn(async move { ticker.run(&broker, cancel).await });
        return;
    }

    let address = config.feed_address().to_string();
    let topic = config.topic().to_string();
    tokio::spawn(async move {
        match RedisPublisher::connect(&address, topic.clone()).await {
            Ok(publisher) => {
                info!("Publishing synthetic events to {topic} every {period:?}");
                ticker.run(&publisher, cancel).await;
            }
            // The broker keeps serving; only the synthetic source is lost.
            Err(e) => error!("Synthetic events disabled, feed {address} unavailable: {e}"),
        }
    });
}
