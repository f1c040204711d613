//! The Feed Client: one logical connection to the upstream streaming endpoint,
//! liveness, reconnect-with-retry-budget, subscription re-issue, and dispatch of
//! classified events (§4.1, §5).

use crate::classifier::classify_frame;
use crate::error::ClientError;
use crate::messages::{subscribe_frame, InboundFrame, RisMessageData, PING_FRAME, PONG_QUIRK_PREFIX};
use futures_util::{SinkExt, StreamExt};
use net_prefix::{MonitoredPrefix, PrefixIndex};
use slog::{crit, debug, error, info, warn, Logger};
use std::time::Duration;
use task_executor::ShutdownReceiver;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::WebSocketStream;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const CONNECT_RETRY_BUDGET: usize = 10;
const PING_PERIOD: Duration = Duration::from_secs(5);

/// Exit code the process should use when the retry budget is exhausted, matching
/// the original's `os._exit(os.EX_TEMPFAIL)`.
pub const EX_TEMPFAIL: i32 = 75;

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Returns true when a frame that failed JSON decoding is nonetheless the known
/// pong-with-invalid-JSON quirk (§4.1, "Liveness protocol"; §9 design notes).
pub fn looks_like_pong(raw: &str) -> bool {
    raw.starts_with(PONG_QUIRK_PREFIX)
}

pub struct FeedClient {
    url: Url,
    proxy: Option<ProxyConfig>,
    monitored: Vec<MonitoredPrefix>,
    index: PrefixIndex,
    log: Logger,
}

impl FeedClient {
    pub fn new(url: Url, proxy: Option<ProxyConfig>, monitored: Vec<MonitoredPrefix>, log: Logger) -> Self {
        let index = PrefixIndex::build(monitored.iter().cloned());
        Self {
            url,
            proxy,
            monitored,
            index,
            log,
        }
    }

    async fn open_tcp_stream(&self) -> Result<TcpStream, ClientError> {
        let host = self.url.host_str().ok_or(ClientError::InvalidUrl)?;
        let port = self
            .url
            .port_or_known_default()
            .unwrap_or(if self.url.scheme() == "wss" { 443 } else { 80 });

        match &self.proxy {
            Some(proxy) => {
                info!(self.log, "using proxy for websocket connection"; "host" => &proxy.host, "port" => proxy.port);
                open_proxy_tunnel(&proxy.host, proxy.port, host, port).await
            }
            None => TcpStream::connect((host, port)).await.map_err(ClientError::Io),
        }
    }

    async fn connect_once(&self) -> Result<WsStream, ClientError> {
        let tcp = self.open_tcp_stream().await?;
        let (ws, _response) = tokio_tungstenite::client_async_tls(self.url.as_str(), tcp).await?;
        Ok(ws)
    }

    /// Up to [`CONNECT_RETRY_BUDGET`] attempts, each bounded by [`CONNECT_TIMEOUT`].
    /// Returns [`ClientError::RetryBudgetExhausted`] when every attempt fails.
    async fn connect_with_retry(&self) -> Result<WsStream, ClientError> {
        for attempt in 1..=CONNECT_RETRY_BUDGET {
            match timeout(CONNECT_TIMEOUT, self.connect_once()).await {
                Ok(Ok(ws)) => {
                    info!(self.log, "websocket connection established");
                    return Ok(ws);
                }
                Ok(Err(e)) => warn!(self.log, "websocket connect failed"; "attempt" => attempt, "error" => %e),
                Err(_) => warn!(self.log, "websocket connect timed out"; "attempt" => attempt),
            }
        }
        crit!(self.log, "websocket connect failed, exiting...");
        Err(ClientError::RetryBudgetExhausted)
    }

    async fn subscribe_all(&self, ws: &mut WsStream) -> Result<(), ClientError> {
        for entry in &self.monitored {
            let prefix = entry.prefix.to_string();
            info!(self.log, "subscribing"; "prefix" => &prefix);
            let frame = subscribe_frame(&prefix);
            let text = serde_json::to_string(&frame)?;
            ws.send(Message::Text(text)).await?;
        }
        Ok(())
    }

    /// Run forever: connect, subscribe, read/ping until a transport or decode
    /// error, then reconnect. Returns `Ok(())` only when `shutdown` fires;
    /// returns [`ClientError::RetryBudgetExhausted`] when the connect retry
    /// budget for one reconnect attempt is exhausted (callers should exit the
    /// process with [`EX_TEMPFAIL`]).
    pub async fn run(
        &self,
        events_tx: tokio::sync::mpsc::UnboundedSender<crate::event::FeedEvent>,
        mut shutdown: ShutdownReceiver,
    ) -> Result<(), ClientError> {
        loop {
            let mut ws = tokio::select! {
                connected = self.connect_with_retry() => connected?,
                _ = shutdown.recv() => return Ok(()),
            };
            self.subscribe_all(&mut ws).await?;

            let mut ping_interval = tokio::time::interval(PING_PERIOD);
            ping_interval.tick().await; // first tick fires immediately; skip it

            'connection: loop {
                tokio::select! {
                    _ = ping_interval.tick() => {
                        let text = serde_json::to_string(&PING_FRAME).expect("ping frame always serializes");
                        if let Err(e) = ws.send(Message::Text(text)).await {
                            warn!(self.log, "ping send failed, reconnecting"; "error" => %e);
                            break 'connection;
                        }
                    }
                    frame = ws.next() => {
                        match frame {
                            Some(Ok(Message::Text(text))) => {
                                if let Err(()) = self.handle_frame(&text, &events_tx) {
                                    break 'connection;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                info!(self.log, "websocket connection closed by peer, reconnecting");
                                break 'connection;
                            }
                            Some(Ok(_)) => { /* ping/pong/binary frames outside the JSON protocol: ignore */ }
                            Some(Err(e)) => {
                                error!(self.log, "websocket read error, reconnecting"; "error" => %e);
                                break 'connection;
                            }
                        }
                    }
                    _ = shutdown.recv() => return Ok(()),
                }
            }

            let _ = ws.close(None).await;
        }
    }

    /// Decode and classify one inbound text frame. `Err(())` signals that the
    /// caller should reconnect (a decode error that is not the pong quirk).
    fn handle_frame(&self, raw: &str, events_tx: &tokio::sync::mpsc::UnboundedSender<crate::event::FeedEvent>) -> Result<(), ()> {
        let envelope: InboundFrame = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                if looks_like_pong(raw) {
                    debug!(self.log, "pong (non-JSON quirk variant)");
                    return Ok(());
                }
                error!(self.log, "decode error, reconnecting"; "error" => %e);
                return Err(());
            }
        };

        match envelope.frame_type.as_str() {
            "pong" => {
                debug!(self.log, "pong");
                Ok(())
            }
            "ris_error" => {
                warn!(self.log, "upstream reported ris_error"; "data" => %envelope.data);
                let frame = serde_json::json!({ "type": envelope.frame_type, "data": envelope.data });
                let _ = events_tx.send(crate::event::FeedEvent::Error(frame));
                Ok(())
            }
            "ris_message" => {
                let data: RisMessageData = match serde_json::from_value(envelope.data) {
                    Ok(data) => data,
                    Err(e) => {
                        error!(self.log, "decode error in ris_message data, reconnecting"; "error" => %e);
                        return Err(());
                    }
                };
                for event in classify_frame(&self.index, &data, &self.log) {
                    let _ = events_tx.send(event);
                }
                Ok(())
            }
            other => {
                debug!(self.log, "ignoring unrecognized frame type"; "type" => other);
                Ok(())
            }
        }
    }
}

async fn open_proxy_tunnel(
    proxy_host: &str,
    proxy_port: u16,
    target_host: &str,
    target_port: u16,
) -> Result<TcpStream, ClientError> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = TcpStream::connect((proxy_host, proxy_port)).await?;
    let request = format!(
        "CONNECT {target_host}:{target_port} HTTP/1.1\r\nHost: {target_host}:{target_port}\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await?;

    let mut response = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        if stream.read_exact(&mut byte).await.is_err() {
            break;
        }
        response.push(byte[0]);
        if response.ends_with(b"\r\n\r\n") {
            break;
        }
    }

    let status_line = String::from_utf8_lossy(&response);
    let status_line = status_line.lines().next().unwrap_or_default();
    if !status_line.contains("200") {
        return Err(ClientError::ProxyConnectFailed(status_line.to_string()));
    }

    Ok(stream)
}
