//! Polling and command engine
//!
//! [`Am43Client`] owns one motor session. It drives the link state machine from
//! transport events, logs in and polls telemetry on a fixed interval, and
//! exposes the fire-and-forget motor commands.
//!
//! # Polling
//! Every [`tick`](Am43Client::tick) first applies the events queued by the
//! transport, then, if the link is up and the poll interval has elapsed:
//! - while unauthenticated, sends LOGIN with the configured PIN
//! - while authenticated, sends the telemetry request selected by the cursor
//!   (battery, position, light) and steps the cursor
//!
//! A freshly connected session polls on its first tick.
//!
//! # Threading
//! The client is not shared. Transport callbacks only push into the event
//! channel; all state changes happen inside `tick`, `process_events` and the
//! async operations, on the caller's task.

use crate::config::ClientConfig;
use am43_core::{Am43Error, Am43Result};
use am43_session::{
    Command, DispatchOutcome, Dispatcher, LinkEvent, LinkState, LinkStatistics, ListenerSlot,
    MoveDirection, SessionListener, SessionState, TelemetryQuery, to_hex,
};
use am43_transport::{Transport, TransportEvent, event_channel};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Client for a single AM43 motor
pub struct Am43Client<T: Transport> {
    transport: T,
    config: ClientConfig,
    session: SessionState,
    dispatcher: Dispatcher,
    listener: ListenerSlot,
    stats: LinkStatistics,
    closed: bool,
}

impl<T: Transport> Am43Client<T> {
    /// Create a client and attach it to `transport`
    ///
    /// Use [`ClientBuilder`](crate::ClientBuilder) for validated construction.
    pub fn new(mut transport: T, config: ClientConfig) -> Self {
        let (sink, events) = event_channel();
        transport.attach(sink);
        let session = SessionState::new(config.device.clone(), config.pin);
        Self {
            transport,
            config,
            session,
            dispatcher: Dispatcher::new(events),
            listener: ListenerSlot::new(),
            stats: LinkStatistics::new(),
            closed: false,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn statistics(&self) -> &LinkStatistics {
        &self.stats
    }

    pub fn clear_statistics(&mut self) {
        self.stats.clear();
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Register the listener, replacing any previous one
    ///
    /// Only a weak reference is kept. Ignored after shutdown.
    pub fn set_listener(&mut self, listener: &Arc<dyn SessionListener>) {
        self.listener.register(listener);
    }

    pub fn clear_listener(&mut self) {
        self.listener.unregister();
    }

    /// Establish the link
    ///
    /// On success the session enters `Connected` and `on_connect` fires. On
    /// failure the session is marked disconnected, `on_disconnect` fires and
    /// the transport error is returned. Connecting an already connected
    /// session does nothing. Queued transport events are applied first, so a
    /// link loss reported since the last tick is not mistaken for a live link.
    pub async fn connect(&mut self) -> Am43Result<()> {
        if self.closed {
            return Err(Am43Error::SessionClosed);
        }
        self.process_events(Instant::now());
        if self.session.is_connected() {
            return Ok(());
        }

        log::debug!("[{}] Connecting", self.session.device());
        match self.transport.connect().await {
            Ok(()) => {
                self.link_event(LinkEvent::TransportUp);
                Ok(())
            }
            Err(e) => {
                log::warn!("[{}] Connection failed: {}", self.session.device(), e);
                self.link_event(LinkEvent::ConnectFailed);
                Err(e)
            }
        }
    }

    /// Tear the link down; the session can connect again afterwards
    pub async fn disconnect(&mut self) -> Am43Result<()> {
        if self.closed {
            return Err(Am43Error::SessionClosed);
        }
        self.process_events(Instant::now());
        self.transport.disconnect().await?;
        if self.session.is_connected() {
            self.link_event(LinkEvent::TransportDown);
        }
        Ok(())
    }

    /// Apply every event the transport queued since the last call
    ///
    /// `now` anchors the login settle delay.
    pub fn process_events(&mut self, now: Instant) {
        for event in self.dispatcher.pending() {
            self.apply_event(event, now);
        }
    }

    fn apply_event(&mut self, event: TransportEvent, now: Instant) {
        match event {
            TransportEvent::Connected => self.link_event(LinkEvent::TransportUp),
            TransportEvent::ConnectFailed(reason) => {
                log::warn!("[{}] Connection failed: {}", self.session.device(), reason);
                self.link_event(LinkEvent::ConnectFailed);
            }
            TransportEvent::Disconnected => self.link_event(LinkEvent::TransportDown),
            TransportEvent::Notify(data) => {
                let outcome = self.dispatcher.handle_notification(
                    &data,
                    &mut self.session,
                    &self.listener,
                    &mut self.stats,
                );
                if outcome == Some(DispatchOutcome::LoginAccepted) {
                    if let Some(due) = now.checked_add(self.config.login_settle()) {
                        self.session.pull_next_poll(due, self.config.poll_interval());
                    }
                }
            }
        }
    }

    fn link_event(&mut self, event: LinkEvent) {
        let Some((from, to)) = self.session.apply(event) else {
            return;
        };

        match to {
            LinkState::Connected if from == LinkState::Disconnected => {
                log::info!("[{}] Connected", self.session.device());
                self.listener.notify(|l| l.on_connect(&self.session));
            }
            LinkState::Disconnected => {
                if from == LinkState::Disconnected {
                    log::info!("[{}] Could not connect", self.session.device());
                } else {
                    log::info!("[{}] Disconnected", self.session.device());
                }
                self.listener.notify(|l| l.on_disconnect(&self.session));
            }
            _ => {}
        }
    }

    /// Advance the polling state machine to `now`
    ///
    /// # Errors
    /// Returns the transport error if the poll frame could not be written.
    /// The poll still counts as sent, so a failing link is retried on the
    /// next interval rather than on every tick.
    pub async fn tick(&mut self, now: Instant) -> Am43Result<()> {
        self.process_events(now);

        if self.closed || !self.session.is_connected() {
            return Ok(());
        }
        if !self.session.poll_due(now, self.config.poll_interval()) {
            return Ok(());
        }

        let result = if self.session.is_logged_in() {
            let query = self.session.next_query();
            log::debug!("[{}] Polling {}", self.session.device(), query.as_str());
            self.stats.increment_telemetry_polls();
            let result = self.write(Command::Query(query)).await;
            self.session.advance_query();
            result
        } else {
            log::debug!("[{}] Logging in", self.session.device());
            self.stats.increment_login_attempts();
            self.write(Command::Login {
                pin: self.session.pin(),
            })
            .await
        };
        self.session.mark_polled(now);
        result
    }

    async fn write(&mut self, command: Command) -> Am43Result<()> {
        let frame = command.encode()?;
        log::debug!(
            "[{}] Sending {:?}: 0x{}",
            self.session.device(),
            command,
            to_hex(&frame)
        );
        self.transport.send(&frame).await?;
        self.stats.increment_frames_sent();
        Ok(())
    }

    fn ensure_connected(&self) -> Am43Result<()> {
        if self.closed {
            return Err(Am43Error::SessionClosed);
        }
        if !self.session.is_connected() {
            return Err(Am43Error::NotConnected);
        }
        Ok(())
    }

    async fn command(&mut self, command: Command) -> Am43Result<()> {
        self.ensure_connected()?;
        self.write(command).await
    }

    /// Open the blind fully
    pub async fn open(&mut self) -> Am43Result<()> {
        self.command(Command::Move(MoveDirection::Open)).await
    }

    /// Close the blind fully
    pub async fn close(&mut self) -> Am43Result<()> {
        self.command(Command::Move(MoveDirection::Close)).await
    }

    pub async fn stop(&mut self) -> Am43Result<()> {
        self.command(Command::Move(MoveDirection::Stop)).await
    }

    /// Move to `level` percent closed
    ///
    /// # Errors
    /// Returns `Am43Error::PositionOutOfRange` for levels above 100; nothing
    /// is sent in that case
    pub async fn set_position(&mut self, level: u8) -> Am43Result<()> {
        let command = Command::set_position(level)?;
        self.command(command).await
    }

    pub async fn get_battery(&mut self) -> Am43Result<()> {
        self.command(Command::Query(TelemetryQuery::Battery)).await
    }

    pub async fn get_position(&mut self) -> Am43Result<()> {
        self.command(Command::Query(TelemetryQuery::Position)).await
    }

    pub async fn get_light(&mut self) -> Am43Result<()> {
        self.command(Command::Query(TelemetryQuery::Light)).await
    }

    /// Tear the session down
    ///
    /// Closes the listener slot, discards queued events and disconnects the
    /// transport. No callback fires once this has started. Idempotent.
    pub async fn shutdown(&mut self) -> Am43Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.listener.close();
        self.dispatcher.close();
        self.session.apply(LinkEvent::TransportDown);
        log::info!("[{}] Session closed", self.session.device());
        self.transport.disconnect().await
    }

    /// Tick every `tick_period` until `shutdown` resolves, then shut down
    ///
    /// Transport events are applied as they arrive. Tick errors are logged
    /// and do not stop the loop.
    pub async fn run<F>(&mut self, tick_period: Duration, shutdown: F) -> Am43Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(tick_period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        while !self.closed {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.tick(Instant::now()).await {
                        log::warn!("[{}] Poll failed: {}", self.session.device(), e);
                    }
                }
                Some(event) = self.dispatcher.next_event() => {
                    self.apply_event(event, Instant::now());
                }
            }
        }

        self.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientBuilder;
    use am43_core::constants::{OP_GET_BATTERY, OP_GET_LIGHT, OP_GET_POSITION, OP_LOGIN};
    use am43_session::{decode, encode};
    use am43_transport::{ChannelTransport, DevicePeer, EventSink};
    use async_trait::async_trait;
    use mockall::mock;
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl SessionListener for Recorder {
        fn on_connect(&self, session: &SessionState) {
            self.record(format!("connect {}", session.link().as_str()));
        }

        fn on_disconnect(&self, session: &SessionState) {
            self.record(format!("disconnect {}", session.was_disconnected()));
        }

        fn on_position(&self, level: u8) {
            self.record(format!("position {}", level));
        }

        fn on_battery_level(&self, level: u8) {
            self.record(format!("battery {}", level));
        }

        fn on_light_level(&self, level: u8) {
            self.record(format!("light {}", level));
        }
    }

    struct Harness {
        client: Am43Client<ChannelTransport>,
        peer: DevicePeer,
        recorder: Arc<Recorder>,
        _listener: Arc<dyn SessionListener>,
        start: Instant,
        interval: Duration,
    }

    impl Harness {
        fn new() -> Self {
            let (transport, peer) = ChannelTransport::pair();
            let recorder = Arc::new(Recorder::default());
            let listener: Arc<dyn SessionListener> = recorder.clone();
            let client = ClientBuilder::new()
                .device("Bedroom", "02:11:22:33:44:55")
                .listener(&listener)
                .build(transport)
                .unwrap();
            let interval = client.config().poll_interval();
            Self {
                client,
                peer,
                recorder,
                _listener: listener,
                start: Instant::now(),
                interval,
            }
        }

        fn at(&self, intervals: u32) -> Instant {
            self.start + self.interval * intervals
        }

        fn opcodes(&mut self) -> Vec<u8> {
            self.peer
                .sent_frames()
                .iter()
                .map(|frame| decode(frame).unwrap().opcode())
                .collect()
        }

        async fn logged_in(mut self) -> Self {
            self.client.connect().await.unwrap();
            self.client.tick(self.at(1)).await.unwrap();
            self.peer.notify(&[0x9A, 0x17, 0x01, 0x5A]);
            self.client.process_events(self.at(1));
            assert!(self.client.session().is_logged_in());
            assert_eq!(self.opcodes(), vec![OP_LOGIN]);
            self
        }
    }

    fn notification(opcode: u8, payload: &[u8]) -> Vec<u8> {
        encode(opcode, payload).unwrap()[4..].to_vec()
    }

    #[tokio::test]
    async fn test_login_then_battery_poll() {
        let mut h = Harness::new();

        h.client.tick(h.at(0)).await.unwrap();
        assert!(h.peer.sent_frames().is_empty());

        h.client.connect().await.unwrap();
        assert_eq!(h.client.session().link(), LinkState::Connected);
        assert_eq!(h.recorder.calls(), vec!["connect Connected"]);

        h.client.tick(h.at(1)).await.unwrap();
        let frames = h.peer.sent_frames();
        assert_eq!(frames.len(), 1);
        let login = decode(&frames[0]).unwrap();
        assert_eq!(login.opcode(), OP_LOGIN);
        assert_eq!(login.payload(), Some(&[0x22, 0xB8][..]));

        h.peer.notify(&[0x9A, 0x17, 0x01, 0x5A]);
        h.client.tick(h.at(2)).await.unwrap();
        assert!(h.client.session().is_logged_in());

        let frames = h.peer.sent_frames();
        assert_eq!(frames.len(), 1);
        let poll = decode(&frames[0]).unwrap();
        assert_eq!(poll.opcode(), OP_GET_BATTERY);
        assert_eq!(poll.payload(), Some(&[0x01][..]));
        assert_eq!(h.client.session().query_cursor(), 1);
    }

    #[tokio::test]
    async fn test_first_tick_after_connect_logs_in() {
        let mut h = Harness::new();
        h.client.connect().await.unwrap();

        h.client.tick(h.at(0)).await.unwrap();
        assert_eq!(h.opcodes(), vec![OP_LOGIN]);

        h.client.tick(h.at(0) + Duration::from_secs(1)).await.unwrap();
        assert!(h.opcodes().is_empty());
    }

    #[tokio::test]
    async fn test_no_telemetry_before_login() {
        let mut h = Harness::new();
        h.client.connect().await.unwrap();

        for i in 1..=5 {
            h.client.tick(h.at(i)).await.unwrap();
            assert_eq!(h.client.session().query_cursor(), 0);
        }
        assert_eq!(h.opcodes(), vec![OP_LOGIN; 5]);
        assert_eq!(h.client.statistics().login_attempts, 5);
        assert_eq!(h.client.statistics().telemetry_polls, 0);
    }

    #[tokio::test]
    async fn test_round_robin_order() {
        let mut h = Harness::new().logged_in().await;

        for i in 2..=5 {
            h.client.tick(h.at(i)).await.unwrap();
        }
        assert_eq!(
            h.opcodes(),
            vec![OP_GET_BATTERY, OP_GET_POSITION, OP_GET_LIGHT, OP_GET_BATTERY]
        );
        assert_eq!(h.client.statistics().telemetry_polls, 4);
    }

    #[tokio::test]
    async fn test_tick_before_interval_sends_nothing() {
        let mut h = Harness::new().logged_in().await;
        h.client.tick(h.at(2)).await.unwrap();
        assert_eq!(h.opcodes(), vec![OP_GET_BATTERY]);

        h.client.tick(h.at(3) - Duration::from_millis(1)).await.unwrap();
        assert!(h.opcodes().is_empty());
        assert_eq!(h.client.session().query_cursor(), 1);
    }

    #[tokio::test]
    async fn test_login_ack_pulls_poll_forward() {
        let mut h = Harness::new();
        h.client.connect().await.unwrap();
        h.client.tick(h.at(1)).await.unwrap();
        h.opcodes();

        let ack_at = h.at(1) + Duration::from_secs(5);
        h.peer.notify(&[0x9A, 0x17, 0x01, 0x5A]);
        h.client.tick(ack_at).await.unwrap();
        assert!(h.opcodes().is_empty());

        h.client.tick(ack_at + Duration::from_millis(999)).await.unwrap();
        assert!(h.opcodes().is_empty());

        h.client.tick(ack_at + Duration::from_secs(1)).await.unwrap();
        assert_eq!(h.opcodes(), vec![OP_GET_BATTERY]);
    }

    #[tokio::test]
    async fn test_login_nack_keeps_retrying() {
        let mut h = Harness::new();
        h.client.connect().await.unwrap();
        h.client.tick(h.at(1)).await.unwrap();

        h.peer.notify(&notification(0x17, &[0xA5]));
        h.client.tick(h.at(2)).await.unwrap();

        assert!(!h.client.session().is_logged_in());
        assert_eq!(h.opcodes(), vec![OP_LOGIN, OP_LOGIN]);
        assert_eq!(h.client.statistics().nacks, 1);
    }

    #[tokio::test]
    async fn test_position_reply_reported_once() {
        let mut h = Harness::new().logged_in().await;

        h.peer.notify(&[0x9A, 0xA7, 0x03, 0x00, 0x00, 0x2D]);
        h.client.process_events(h.at(1));

        assert_eq!(h.client.session().open_level(), Some(45));
        let positions: Vec<_> = h
            .recorder
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("position"))
            .collect();
        assert_eq!(positions, vec!["position 45"]);
    }

    #[tokio::test]
    async fn test_telemetry_updates_session() {
        let mut h = Harness::new().logged_in().await;

        h.peer.notify(&notification(0xA2, &[0, 0, 0, 0, 0x50]));
        h.peer.notify(&notification(0xAA, &[0, 0, 0x03]));
        h.peer.notify(&notification(0xA1, &[0, 0x14]));
        h.peer.notify(&[0x9A]);
        h.client.process_events(h.at(1));

        let session = h.client.session();
        assert_eq!(session.battery_percent(), Some(80));
        assert_eq!(session.light_level(), Some(3));
        assert_eq!(session.open_level(), Some(20));
        assert_eq!(h.client.statistics().replies_dropped, 1);
        assert_eq!(
            h.recorder.calls(),
            vec!["connect Connected", "battery 80", "light 3", "position 20"]
        );
    }

    #[tokio::test]
    async fn test_set_position_out_of_range_sends_nothing() {
        let mut h = Harness::new();
        h.client.connect().await.unwrap();

        let result = h.client.set_position(150).await;
        assert!(matches!(result, Err(Am43Error::PositionOutOfRange(150))));
        assert!(h.peer.sent_frames().is_empty());
        assert_eq!(h.client.statistics().frames_sent, 0);

        h.client.set_position(100).await.unwrap();
        let frames = h.peer.sent_frames();
        assert_eq!(decode(&frames[0]).unwrap().payload(), Some(&[100][..]));
    }

    #[tokio::test]
    async fn test_commands_require_link() {
        let mut h = Harness::new();
        assert!(matches!(h.client.open().await, Err(Am43Error::NotConnected)));
        assert!(matches!(h.client.get_battery().await, Err(Am43Error::NotConnected)));
        assert!(h.peer.sent_frames().is_empty());
    }

    #[tokio::test]
    async fn test_commands_allowed_before_login() {
        let mut h = Harness::new();
        h.client.connect().await.unwrap();

        h.client.open().await.unwrap();
        h.client.close().await.unwrap();
        h.client.stop().await.unwrap();
        h.client.get_position().await.unwrap();
        h.client.get_light().await.unwrap();

        let frames = h.peer.sent_frames();
        let payloads: Vec<_> = frames
            .iter()
            .map(|f| decode(f).unwrap().payload().unwrap().to_vec())
            .collect();
        assert_eq!(
            payloads,
            vec![vec![0xDD], vec![0xEE], vec![0xCC], vec![0x01], vec![0x01]]
        );
        assert_eq!(h.client.session().query_cursor(), 0);
        assert!(!h.client.session().is_logged_in());
    }

    #[tokio::test]
    async fn test_link_loss_and_reconnect() {
        let mut h = Harness::new().logged_in().await;
        h.client.tick(h.at(2)).await.unwrap();
        assert_eq!(h.client.session().query_cursor(), 1);

        h.peer.drop_link();
        h.client.tick(h.at(3)).await.unwrap();
        assert_eq!(h.client.session().link(), LinkState::Disconnected);
        assert!(h.client.session().was_disconnected());
        assert!(h.recorder.calls().contains(&"disconnect true".to_string()));
        assert_eq!(h.opcodes(), vec![OP_GET_BATTERY]);

        h.client.connect().await.unwrap();
        assert_eq!(h.client.session().query_cursor(), 0);
        assert!(!h.client.session().is_logged_in());
        h.client.tick(h.at(3)).await.unwrap();
        assert_eq!(h.opcodes(), vec![OP_LOGIN]);
    }

    #[tokio::test]
    async fn test_reconnect_after_unprocessed_link_loss() {
        let mut h = Harness::new();
        h.client.connect().await.unwrap();
        h.peer.drop_link();

        h.client.connect().await.unwrap();
        assert_eq!(h.peer.connect_attempts(), 2);
        assert!(h.peer.is_connected());

        h.client.tick(h.at(0)).await.unwrap();
        assert_eq!(h.client.session().link(), LinkState::Connected);
        assert_eq!(
            h.recorder.calls(),
            vec!["connect Connected", "disconnect true", "connect Connected"]
        );
        assert_eq!(h.opcodes(), vec![OP_LOGIN]);
    }

    #[tokio::test]
    async fn test_disconnect_applies_queued_link_loss() {
        let mut h = Harness::new();
        h.client.connect().await.unwrap();
        h.peer.drop_link();

        h.client.disconnect().await.unwrap();
        assert_eq!(h.client.session().link(), LinkState::Disconnected);
        assert_eq!(h.recorder.calls(), vec!["connect Connected", "disconnect true"]);
    }

    #[tokio::test]
    async fn test_local_disconnect_reported_once() {
        let mut h = Harness::new();
        h.client.connect().await.unwrap();
        h.client.disconnect().await.unwrap();

        // the stack echoes the local disconnect through its link-loss callback
        h.peer.drop_link();
        h.client.tick(h.at(1)).await.unwrap();

        assert_eq!(h.recorder.calls(), vec!["connect Connected", "disconnect true"]);
        assert!(h.opcodes().is_empty());
    }

    #[tokio::test]
    async fn test_stack_connect_failure_reported() {
        let mut h = Harness::new();
        h.peer.report_connect_failure("gatt error 133");
        h.client.tick(h.at(0)).await.unwrap();

        assert_eq!(h.client.session().link(), LinkState::Disconnected);
        assert!(h.client.session().was_disconnected());
        assert_eq!(h.recorder.calls(), vec!["disconnect true"]);
    }

    #[tokio::test]
    async fn test_connect_failure_reports_disconnect() {
        let mut h = Harness::new();
        h.peer.refuse_connections(true);

        let result = h.client.connect().await;
        assert!(matches!(result, Err(Am43Error::Transport(_))));
        assert_eq!(h.client.session().link(), LinkState::Disconnected);
        assert!(h.client.session().was_disconnected());
        assert_eq!(h.recorder.calls(), vec!["disconnect true"]);

        h.peer.refuse_connections(false);
        h.client.connect().await.unwrap();
        assert!(h.client.session().was_disconnected());
    }

    #[tokio::test]
    async fn test_stack_initiated_connect() {
        let mut h = Harness::new();
        h.peer.announce_connected();
        h.client.tick(h.at(0)).await.unwrap();

        assert_eq!(h.recorder.calls(), vec!["connect Connected"]);
        assert_eq!(h.opcodes(), vec![OP_LOGIN]);
        assert_eq!(h.peer.connect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_silences_callbacks() {
        let mut h = Harness::new().logged_in().await;

        h.client.shutdown().await.unwrap();
        h.client.shutdown().await.unwrap();
        assert!(h.client.is_closed());
        assert!(!h.peer.is_connected());

        assert!(!h.peer.notify(&notification(0xA2, &[0, 0, 0, 0, 0x10])));
        h.client.tick(h.at(5)).await.unwrap();
        assert_eq!(h.client.session().battery_percent(), None);
        assert!(h.opcodes().is_empty());
        assert_eq!(h.recorder.calls(), vec!["connect Connected"]);

        assert!(matches!(h.client.open().await, Err(Am43Error::SessionClosed)));
        assert!(matches!(h.client.connect().await, Err(Am43Error::SessionClosed)));
    }

    #[tokio::test]
    async fn test_dropped_listener_is_ignored() {
        let (transport, mut peer) = ChannelTransport::pair();
        let mut client = ClientBuilder::new().build(transport).unwrap();
        {
            let listener: Arc<dyn SessionListener> = Arc::new(Recorder::default());
            client.set_listener(&listener);
        }
        client.connect().await.unwrap();
        peer.notify(&notification(0xA1, &[0, 0x30]));
        client.tick(Instant::now()).await.unwrap();

        assert_eq!(client.session().open_level(), Some(48));
        assert_eq!(peer.sent_frames().len(), 1);
    }

    #[tokio::test]
    async fn test_statistics_clear() {
        let mut h = Harness::new().logged_in().await;
        assert_eq!(h.client.statistics().frames_sent, 1);
        assert_eq!(h.client.statistics().replies_received, 1);

        h.client.clear_statistics();
        assert_eq!(h.client.statistics(), &LinkStatistics::default());
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let (transport, mut peer) = ChannelTransport::pair();
        let mut client = ClientBuilder::new().build(transport).unwrap();
        client.connect().await.unwrap();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let watcher = async {
            let frame = peer.recv_frame().await;
            let _ = stop_tx.send(());
            frame
        };
        let stopped = async {
            let _ = stop_rx.await;
        };

        let (result, frame) = tokio::join!(client.run(Duration::from_millis(5), stopped), watcher);
        result.unwrap();
        assert_eq!(decode(&frame.unwrap()).unwrap().opcode(), OP_LOGIN);
        assert!(client.is_closed());
        assert!(!peer.is_connected());
    }

    mock! {
        Link {}

        #[async_trait]
        impl Transport for Link {
            fn attach(&mut self, sink: EventSink);
            async fn connect(&mut self) -> Am43Result<()>;
            async fn send(&mut self, frame: &[u8]) -> Am43Result<()>;
            async fn disconnect(&mut self) -> Am43Result<()>;
            fn is_connected(&self) -> bool;
        }
    }

    fn mock_link() -> MockLink {
        let mut link = MockLink::new();
        link.expect_attach().times(1).return_const(());
        link
    }

    #[tokio::test]
    async fn test_disconnected_tick_never_sends() {
        let mut link = mock_link();
        link.expect_send().times(0);
        link.expect_connect().times(0);

        let mut client = Am43Client::new(link, ClientConfig::default());
        let start = Instant::now();
        for i in 0..4 {
            client.tick(start + Duration::from_secs(60 * i)).await.unwrap();
        }
        assert!(matches!(client.stop().await, Err(Am43Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_one_frame_per_command() {
        let mut link = mock_link();
        link.expect_connect().times(1).returning(|| Ok(()));
        link.expect_send()
            .withf(|frame| frame.len() == 9 && frame[5] == 0x0A && frame[7] == 0xDD)
            .times(1)
            .returning(|_| Ok(()));

        let mut client = Am43Client::new(link, ClientConfig::default());
        assert_ok!(client.connect().await);
        assert_ok!(client.open().await);
        assert_eq!(client.statistics().frames_sent, 1);
    }

    #[tokio::test]
    async fn test_send_failure_still_waits_for_interval() {
        let mut link = mock_link();
        link.expect_connect().times(1).returning(|| Ok(()));
        link.expect_send()
            .times(2)
            .returning(|_| Err(Am43Error::Transport("write failed".to_string())));

        let mut client = Am43Client::new(link, ClientConfig::default());
        client.connect().await.unwrap();

        let start = Instant::now();
        assert_err!(client.tick(start).await);
        assert_ok!(client.tick(start + Duration::from_secs(1)).await);
        assert_err!(client.tick(start + Duration::from_secs(30)).await);
        assert_eq!(client.statistics().login_attempts, 2);
        assert_eq!(client.statistics().frames_sent, 0);
    }

    #[tokio::test]
    async fn test_shutdown_disconnects_once() {
        let mut link = mock_link();
        link.expect_connect().times(1).returning(|| Ok(()));
        link.expect_disconnect().times(1).returning(|| Ok(()));

        let mut client = Am43Client::new(link, ClientConfig::default());
        client.connect().await.unwrap();
        client.shutdown().await.unwrap();
        client.shutdown().await.unwrap();
        assert!(!client.session().is_connected());
    }

    #[test]
    fn test_session_serializes_for_bridge() {
        let (transport, _peer) = ChannelTransport::pair();
        let client = ClientBuilder::new()
            .device("Study", "02:00:00:00:00:0C")
            .build(transport)
            .unwrap();
        let json = serde_json::to_value(client.session()).unwrap();
        assert_eq!(json["link"], "Disconnected");
        assert_eq!(json["device"]["name"], "Study");
        assert_eq!(json["battery_percent"], serde_json::Value::Null);
    }
}
