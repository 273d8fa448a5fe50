//! # Request Server Module
//!
//! Orchestrates one reading-serving cycle per broadcast tick or inbound
//! query.
//!
//! This module handles:
//! - Broadcast mode: fixed-period publication from process start until the
//!   trajectory completes
//! - Query/reply mode: on-demand readings gated on the launch trigger
//! - The launch-trigger subscription arming the gate
//! - Noise sampling of the trajectory truth per channel
//!
//! Protocol-edge conditions are normal outcomes, not failures: a request
//! before launch gets a noisy rest reading, a request after flight
//! completion gets the zero-length sentinel payload. Transport failures on
//! a single publish or reply are logged and the loop keeps serving.

use std::time::Instant;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::launch::LaunchGate;
use crate::noise::{CovarianceTable, NoiseModel};
use crate::trajectory::TrajectoryModel;
use crate::transport::Transport;
use crate::wire::{encode_reading, Reading, SensorKind, WireFormat};

/// The reading-serving core: trajectory, noise, gate and wire format for
/// one simulated channel.
///
/// Stateless per request apart from the launch gate and the noise source,
/// both safe to share across the concurrent trigger and query contexts.
#[derive(Debug)]
pub struct RequestServer {
    kind: SensorKind,
    format: WireFormat,
    data_topic: String,
    launch_topic: String,
    launch_token: Vec<u8>,
    period: Duration,
    model: TrajectoryModel,
    noise: NoiseModel,
    /// Per-field variances in wire order, resolved once at startup
    variances: Vec<f64>,
    gate: LaunchGate,
}

impl RequestServer {
    /// Build the server from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the covariance overrides are
    /// invalid or leave a required field without an entry.
    pub fn from_config(config: &Config) -> Result<Self> {
        let table = CovarianceTable::with_overrides(&config.covariance)?;
        let variances = table.variances(config.sensor.kind)?;

        Ok(Self {
            kind: config.sensor.kind,
            format: config.wire.format,
            data_topic: config.data_topic(),
            launch_topic: config.launch.topic.clone(),
            launch_token: config.launch.token.clone().into_bytes(),
            period: Duration::from_millis(config.broadcast.period_ms),
            model: TrajectoryModel::new(&config.trajectory_params()),
            noise: NoiseModel::new(),
            variances,
            gate: LaunchGate::new(),
        })
    }

    /// Replace the noise source, e.g. with a seeded one for reproducible
    /// tests
    pub fn with_noise(mut self, noise: NoiseModel) -> Self {
        self.noise = noise;
        self
    }

    /// The trajectory model this server samples
    pub fn model(&self) -> &TrajectoryModel {
        &self.model
    }

    /// The launch gate this server consults
    pub fn gate(&self) -> &LaunchGate {
        &self.gate
    }

    /// True field values for this channel at elapsed flight time `t`, in
    /// wire order
    fn flight_truth(&self, t: f64) -> Vec<f64> {
        match self.kind {
            SensorKind::Imu => {
                let a = self.model.acceleration();
                vec![a.x, a.y, a.z]
            }
            SensorKind::Gyro => {
                let w = self.model.angular_velocity(t);
                vec![w.x, w.y, w.z]
            }
            SensorKind::Altitude => vec![self.model.position(t).z],
            SensorKind::Kinematics => {
                let p = self.model.position(t);
                let v = self.model.velocity(t);
                let a = self.model.acceleration();
                vec![p.x, p.y, p.z, v.x, v.y, v.z, a.x, a.y, a.z]
            }
        }
    }

    /// True field values before launch: every channel reads rest zeros,
    /// matching the calibration the downstream pipeline was built against
    fn rest_truth(&self) -> Vec<f64> {
        vec![0.0; self.kind.field_count()]
    }

    /// Perturb truth values with the per-field calibrated noise
    fn sample(&self, truth: &[f64]) -> Reading {
        let values = truth
            .iter()
            .zip(&self.variances)
            .map(|(&value, &variance)| self.noise.noisy(value, variance) as f32)
            .collect();
        Reading::new(self.kind, values)
    }

    /// Serve one reading request at clock instant `now`.
    ///
    /// Returns the encoded reading, or the zero-length sentinel once the
    /// trajectory is complete. Pre-launch requests are served a noisy rest
    /// reading; neither edge is an error.
    pub fn handle_request(&self, now: Instant) -> Vec<u8> {
        if !self.gate.is_armed() {
            return encode_reading(&self.sample(&self.rest_truth()), self.format);
        }

        let elapsed = self.gate.elapsed(now);
        if elapsed > self.model.flight_time() {
            return Vec::new();
        }

        encode_reading(&self.sample(&self.flight_truth(elapsed)), self.format)
    }

    /// Handle one message from the launch topic at clock instant `now`.
    ///
    /// Only a payload equal to the designated token arms the gate;
    /// anything else is ignored. Repeat triggers never reset the flight
    /// clock.
    pub fn handle_launch(&self, payload: &[u8], now: Instant) {
        if payload != self.launch_token.as_slice() {
            debug!(
                "Ignoring non-trigger message on {} ({} bytes)",
                self.launch_topic,
                payload.len()
            );
            return;
        }

        if self.gate.arm(now) {
            info!("Launch trigger received, flight clock started");
        } else {
            debug!("Launch trigger repeated, gate already armed");
        }
    }

    /// Broadcast mode: publish a reading every period until the trajectory
    /// completes.
    ///
    /// The flight clock free-runs from loop start; the launch gate does
    /// not participate. Completion terminates the loop, not the process.
    ///
    /// # Errors
    ///
    /// Returns error only on transport setup failure; individual publish
    /// failures are logged and skipped.
    pub async fn run_broadcast(&self, transport: &dyn Transport) -> Result<()> {
        info!(
            "Broadcasting {} readings on {} every {}ms",
            self.kind,
            self.data_topic,
            self.period.as_millis()
        );
        info!(
            "Flight time: {:.2}s, max altitude: {:.2}m",
            self.model.flight_time(),
            self.model.max_altitude()
        );

        let mut ticker = interval(self.period);
        let start = Instant::now();
        let mut published: u64 = 0;

        loop {
            ticker.tick().await;

            let elapsed = start.elapsed().as_secs_f64();
            if elapsed > self.model.flight_time() {
                info!(
                    "Trajectory complete after {} readings, stopping broadcast",
                    published
                );
                break;
            }

            let reading = self.sample(&self.flight_truth(elapsed));
            debug!("t={:.2}s: {} {:?}", elapsed, self.kind, reading.values);

            let payload = encode_reading(&reading, self.format);
            if let Err(e) = transport.publish(&self.data_topic, &payload).await {
                warn!("Failed to publish reading: {}", e);
                continue;
            }
            published += 1;
        }

        Ok(())
    }

    /// Query/reply mode: serve readings on demand, arming the gate from
    /// the launch topic.
    ///
    /// Runs until either inbound stream closes (session teardown). Reply
    /// failures are logged and the loop keeps serving.
    ///
    /// # Errors
    ///
    /// Returns error on transport setup or teardown failure.
    pub async fn run_query_reply(&self, transport: &dyn Transport) -> Result<()> {
        info!(
            "Serving {} queries on {}, launch trigger on {}",
            self.kind, self.data_topic, self.launch_topic
        );
        info!(
            "Flight time: {:.2}s, max altitude: {:.2}m",
            self.model.flight_time(),
            self.model.max_altitude()
        );

        let mut triggers = transport.subscribe(&self.launch_topic).await?;
        let mut queries = transport.serve_queries(&self.data_topic).await?;

        loop {
            tokio::select! {
                message = triggers.recv() => match message {
                    Some(payload) => self.handle_launch(&payload, Instant::now()),
                    None => {
                        info!("Launch subscription closed, stopping");
                        break;
                    }
                },
                query = queries.recv() => match query {
                    Some(query) => {
                        let reply = self.handle_request(Instant::now());
                        debug!(
                            "Query on {}: replying {} bytes",
                            query.topic(),
                            reply.len()
                        );
                        if let Err(e) = query.reply(&reply).await {
                            warn!("Failed to reply to query: {}", e);
                        }
                    }
                    None => {
                        info!("Query stream closed, stopping");
                        break;
                    }
                },
            }
        }

        triggers.unsubscribe().await?;
        queries.stop().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::adapter::mocks::{MockQuery, MockTransport};
    use std::sync::Arc;

    /// Config for `kind` with every variance zeroed, so readings are exact
    fn zero_noise_config(kind: SensorKind) -> Config {
        let mut config = Config::default();
        config.sensor.kind = kind;
        config.sensor.id = format!("{}0", kind);
        let fields = kind
            .field_names()
            .iter()
            .map(|&name| (name.to_string(), 0.0))
            .collect();
        config.covariance.insert(kind, fields);
        config
    }

    fn decode_flat(payload: &[u8]) -> Vec<f32> {
        payload
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn test_prelaunch_reading_is_noise_around_rest() {
        let server =
            RequestServer::from_config(&zero_noise_config(SensorKind::Kinematics)).unwrap();

        let payload = server.handle_request(Instant::now());
        assert_eq!(decode_flat(&payload), vec![0.0; 9]);
    }

    #[test]
    fn test_prelaunch_reading_for_every_kind_is_nonempty() {
        for kind in SensorKind::ALL {
            let server = RequestServer::from_config(&zero_noise_config(kind)).unwrap();
            let payload = server.handle_request(Instant::now());
            assert_eq!(payload.len(), kind.field_count() * 4);
        }
    }

    #[test]
    fn test_launch_token_arms_the_gate() {
        let server = RequestServer::from_config(&Config::default()).unwrap();

        server.handle_launch(b"ignition?", Instant::now());
        assert!(!server.gate().is_armed());

        server.handle_launch(b"LAUNCH", Instant::now());
        assert!(server.gate().is_armed());
    }

    #[test]
    fn test_repeat_trigger_keeps_the_original_clock() {
        let server = RequestServer::from_config(&Config::default()).unwrap();
        let t0 = Instant::now();

        server.handle_launch(b"LAUNCH", t0);
        server.handle_launch(b"LAUNCH", t0 + Duration::from_secs(5));

        let elapsed = server.gate().elapsed(t0 + Duration::from_secs(8));
        assert!((elapsed - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_midflight_reading_tracks_the_trajectory() {
        let server =
            RequestServer::from_config(&zero_noise_config(SensorKind::Kinematics)).unwrap();
        let t0 = Instant::now();
        server.handle_launch(b"LAUNCH", t0);

        let half = server.model().flight_time() / 2.0;
        let payload = server.handle_request(t0 + Duration::from_secs_f64(half));
        let values = decode_flat(&payload);

        assert_eq!(values.len(), 9);
        assert!(values.iter().all(|v| v.is_finite()));

        // Zero variance: fields match the model apex state up to f32
        // rounding (the gate elapsed differs from `half` by clock
        // granularity only)
        let apex = server.model().position(half);
        assert!((values[0] as f64 - apex.x).abs() < 1e-3);
        assert!((values[1] as f64 - apex.y).abs() < 1e-3);
        assert!((values[2] as f64 - apex.z).abs() < 1e-3);
        // Vertical velocity crosses zero at apex
        assert!(values[5].abs() < 1e-3);
    }

    #[test]
    fn test_postflight_request_returns_the_empty_sentinel() {
        for kind in SensorKind::ALL {
            let server = RequestServer::from_config(&zero_noise_config(kind)).unwrap();
            let t0 = Instant::now();
            server.handle_launch(b"LAUNCH", t0);

            let after = server.model().flight_time() + 1.0;
            let payload = server.handle_request(t0 + Duration::from_secs_f64(after));
            assert!(payload.is_empty(), "kind {} must serve the sentinel", kind);
        }
    }

    #[test]
    fn test_reference_trajectory_end_to_end() {
        // 100 m/s at 75 deg, azimuth 30 deg, g = 9.81
        let server =
            RequestServer::from_config(&zero_noise_config(SensorKind::Kinematics)).unwrap();

        assert!((server.model().flight_time() - 19.693).abs() < 1e-2);
        assert!((server.model().max_altitude() - 475.58).abs() < 5e-1);

        let t0 = Instant::now();
        server.handle_launch(b"LAUNCH", t0);

        // Mid-flight: non-empty, finite position fields
        let payload = server.handle_request(t0 + Duration::from_secs_f64(9.85));
        let values = decode_flat(&payload);
        assert_eq!(values.len(), 9);
        assert!(values[..3].iter().all(|v| v.is_finite()));

        // Post-flight: the sentinel
        let payload = server.handle_request(t0 + Duration::from_secs_f64(25.0));
        assert!(payload.is_empty());
    }

    #[test]
    fn test_altitude_channel_reads_position_z() {
        let server =
            RequestServer::from_config(&zero_noise_config(SensorKind::Altitude)).unwrap();
        let t0 = Instant::now();
        server.handle_launch(b"LAUNCH", t0);

        let t = 2.0;
        let payload = server.handle_request(t0 + Duration::from_secs_f64(t));
        let values = decode_flat(&payload);

        assert_eq!(values.len(), 1);
        assert!((values[0] as f64 - server.model().position(t).z).abs() < 1e-3);
    }

    #[test]
    fn test_framed_format_serves_framed_payloads() {
        let mut config = zero_noise_config(SensorKind::Gyro);
        config.wire.format = WireFormat::Framed;

        let server = RequestServer::from_config(&config).unwrap();
        let payload = server.handle_request(Instant::now());

        assert_eq!(
            payload.len(),
            crate::wire::encoded_len(SensorKind::Gyro, WireFormat::Framed)
        );
        assert_eq!(payload[0], crate::wire::protocol::FRAME_SYNC_BYTE);
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let make = || {
            RequestServer::from_config(&Config::default())
                .unwrap()
                .with_noise(NoiseModel::seeded(1234))
        };
        let a = make();
        let b = make();

        let now = Instant::now();
        assert_eq!(a.handle_request(now), b.handle_request(now));
    }

    /// Config with a sub-second flight so async loop tests finish quickly
    fn short_flight_config(kind: SensorKind) -> Config {
        let mut config = zero_noise_config(kind);
        config.trajectory.initial_speed = 0.1;
        config.trajectory.launch_angle_deg = 45.0;
        config.broadcast.period_ms = 1;
        config
    }

    #[tokio::test]
    async fn test_broadcast_publishes_until_flight_complete() {
        let server =
            RequestServer::from_config(&short_flight_config(SensorKind::Altitude)).unwrap();
        let transport = MockTransport::new();

        server.run_broadcast(&transport).await.unwrap();

        let published = transport.get_published();
        assert!(!published.is_empty());
        for (topic, payload) in &published {
            assert_eq!(topic, "devices/altitude0");
            assert_eq!(payload.len(), 4);
        }
    }

    #[tokio::test]
    async fn test_broadcast_survives_publish_failures() {
        let server =
            RequestServer::from_config(&short_flight_config(SensorKind::Gyro)).unwrap();
        let transport = MockTransport::new();
        transport.set_fail_publish(true);

        // Every publish fails; the loop must still terminate cleanly
        server.run_broadcast(&transport).await.unwrap();
        assert!(transport.get_published().is_empty());
    }

    #[tokio::test]
    async fn test_query_reply_loop_serves_and_arms() {
        let config = short_flight_config(SensorKind::Kinematics);
        let data_topic = config.data_topic();
        let launch_topic = config.launch.topic.clone();

        let server = Arc::new(RequestServer::from_config(&config).unwrap());
        let transport = Arc::new(MockTransport::new());

        let launch_tx = transport.message_sender(&launch_topic);
        let query_tx = transport.query_sender(&data_topic);

        let task = {
            let server = Arc::clone(&server);
            let transport = Arc::clone(&transport);
            tokio::spawn(async move { server.run_query_reply(&*transport).await })
        };

        // Pre-launch query: noisy rest reading
        let (query, mut reply_rx) = MockQuery::new(&data_topic);
        query_tx.send(query).unwrap();
        let reply = reply_rx.recv().await.unwrap();
        assert_eq!(reply.len(), 36);

        // Arm, wait out the sub-second flight, then expect the sentinel
        launch_tx.send(b"LAUNCH".to_vec()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(server.gate().is_armed());

        let (query, mut reply_rx) = MockQuery::new(&data_topic);
        query_tx.send(query).unwrap();
        let reply = reply_rx.recv().await.unwrap();
        assert!(reply.is_empty());

        // Session teardown closes both inbound streams and ends the loop
        drop(launch_tx);
        drop(query_tx);
        transport.close().await.unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_query_reply_ignores_foreign_payloads() {
        let config = Config::default();
        let launch_topic = config.launch.topic.clone();
        let data_topic = config.data_topic();

        let server = Arc::new(RequestServer::from_config(&config).unwrap());
        let transport = Arc::new(MockTransport::new());

        let launch_tx = transport.message_sender(&launch_topic);
        let _query_tx = transport.query_sender(&data_topic);

        let task = {
            let server = Arc::clone(&server);
            let transport = Arc::clone(&transport);
            tokio::spawn(async move { server.run_query_reply(&*transport).await })
        };

        launch_tx.send(b"launch".to_vec()).unwrap();
        launch_tx.send(b"".to_vec()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!server.gate().is_armed());

        drop(launch_tx);
        drop(_query_tx);
        transport.close().await.unwrap();
        task.await.unwrap().unwrap();
    }
}
