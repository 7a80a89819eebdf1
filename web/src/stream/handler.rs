use crate::error::Error;
use crate::extractors::streaming_transport::StreamingTransport;
use crate::params::stream::StreamParams;
use crate::AppState;
use async_stream::stream;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONNECTION, CONTENT_TYPE,
};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use log::*;
use std::convert::Infallible;

/// Long-lived event stream for one client.
///
/// The subscriber is registered before the response starts, so the client
/// sees every event published after the headers arrive. When the client goes
/// away hyper drops the body, which drops the subscription and deregisters it.
pub(crate) async fn sse_handler(
    _transport: StreamingTransport,
    Query(params): Query<StreamParams>,
    State(app_state): State<AppState>,
) -> Result<Response, Error> {
    let framing = params.framing();
    let mut subscription = app_state.broker.subscribe().await?;
    let subscriber_id = subscription.id();

    debug!("Establishing {framing:?} event stream for subscriber {subscriber_id}");

    // Each frame is its own body chunk, and hyper flushes every chunk as it is written.
    let stream = stream! {
        while let Some(event) = subscription.recv().await {
            yield Ok::<Bytes, Infallible>(framing.frame(&event));
        }

        // The broker stopped writing: eviction or shutdown.
        debug!("Event stream closed by the broker for subscriber {subscriber_id}");
    };

    Ok((
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
            (CONNECTION, "keep-alive"),
            (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use crate::error::STREAMING_UNSUPPORTED;
    use crate::router::define_routes;
    use crate::AppState;
    use axum::body::{to_bytes, Body, BodyDataStream};
    use axum::http::{header, Request, StatusCode, Version};
    use axum::Router;
    use bytes::Bytes;
    use futures_util::StreamExt;
    use service::config::Config;
    use sse::{Broker, BrokerConfig};
    use std::time::Duration;
    use tokio::time::timeout;
    use tower::ServiceExt;

    fn app(broker: &Broker) -> Router {
        define_routes(AppState::new(
            Config::default().set_stream_path("/"),
            broker.clone(),
        ))
        .unwrap()
    }

    async fn open_stream(app: Router, uri: &str) -> BodyDataStream {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response.into_body().into_data_stream()
    }

    async fn next_frame(body: &mut BodyDataStream) -> Bytes {
        timeout(Duration::from_secs(5), body.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("body error")
    }

    async fn wait_for_subscribers(broker: &Broker, expected: usize) {
        timeout(Duration::from_secs(5), async {
            while broker.subscriber_count().await.unwrap() != expected {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("subscriber count never settled");
    }

    #[tokio::test]
    async fn test_stream_sets_event_stream_headers() {
        let broker = Broker::new(BrokerConfig::default());
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app(&broker).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers[header::CONNECTION], "keep-alive");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_stream_delivers_sse_frames_to_every_open_stream() {
        let broker = Broker::new(BrokerConfig::default());

        let mut a = open_stream(app(&broker), "/").await;
        broker.publish("hello").await.unwrap();
        assert_eq!(next_frame(&mut a).await, Bytes::from_static(b"data: hello\n\n"));

        let mut b = open_stream(app(&broker), "/").await;
        broker.publish("world").await.unwrap();
        assert_eq!(next_frame(&mut a).await, Bytes::from_static(b"data: world\n\n"));
        assert_eq!(next_frame(&mut b).await, Bytes::from_static(b"data: world\n\n"));
    }

    #[tokio::test]
    async fn test_stream_raw_mode_omits_data_prefix() {
        let broker = Broker::new(BrokerConfig::default());

        let mut a = open_stream(app(&broker), "/?raw").await;
        broker.publish("x").await.unwrap();

        assert_eq!(next_frame(&mut a).await, Bytes::from_static(b"x\n"));
    }

    #[tokio::test]
    async fn test_stream_rejects_transport_without_incremental_flush() {
        let broker = Broker::new(BrokerConfig::default());
        let request = Request::builder()
            .uri("/")
            .version(Version::HTTP_10)
            .body(Body::empty())
            .unwrap();

        let response = app(&broker).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], STREAMING_UNSUPPORTED.as_bytes());
        assert_eq!(broker.subscriber_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_client_disconnect_deregisters_subscriber() {
        let broker = Broker::new(BrokerConfig::default());

        let a = open_stream(app(&broker), "/").await;
        let _b = open_stream(app(&broker), "/?raw").await;
        assert_eq!(broker.subscriber_count().await.unwrap(), 2);

        // Hyper drops the body when the client goes away.
        drop(a);
        wait_for_subscribers(&broker, 1).await;
    }

    #[tokio::test]
    async fn test_closing_the_socket_deregisters_subscriber() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};

        let broker = Broker::new(BrokerConfig::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = app(&broker);
        tokio::spawn(async move { axum::serve(listener, router).await });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();

        let mut head = [0u8; 12];
        timeout(Duration::from_secs(5), client.read_exact(&mut head))
            .await
            .expect("no response head")
            .unwrap();
        assert_eq!(&head, b"HTTP/1.1 200");
        wait_for_subscribers(&broker, 1).await;

        // No event is published, so only hyper's close detection can release it.
        drop(client);
        wait_for_subscribers(&broker, 0).await;
    }

    #[tokio::test]
    async fn test_stream_ends_when_broker_shuts_down() {
        let broker = Broker::new(BrokerConfig::default());
        let mut a = open_stream(app(&broker), "/").await;

        broker.shutdown();
        broker.shutdown();

        let end = timeout(Duration::from_secs(5), a.next())
            .await
            .expect("stream did not end");
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn test_stream_unavailable_after_shutdown() {
        let broker = Broker::new(BrokerConfig::default());
        broker.shutdown();
        broker.closed().await;

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app(&broker).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_stream_served_on_configured_path() {
        let broker = Broker::new(BrokerConfig::default());
        let router = define_routes(AppState::new(
            Config::default().set_stream_path("/events"),
            broker.clone(),
        ))
        .unwrap();

        let request = Request::builder().uri("/events?raw=1").body(Body::empty()).unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let mut body = response.into_body().into_data_stream();

        broker.publish("moved").await.unwrap();
        assert_eq!(next_frame(&mut body).await, Bytes::from_static(b"moved\n"));

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
