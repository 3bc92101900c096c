//! Live pose control of the robot
//!
//! [`ServoTable`] holds the value of every servo. [`PoseController`] sends
//! that table to the robot as a one-frame pose command, either on demand or
//! periodically in continuous mode, and surfaces inbound frames and transport
//! errors on every [`update`](PoseController::update).

use crate::config::{AppConfig, ControllerConfig, SerialConfig};
use crate::error::{Error, Result};
use crate::motion::{Pose, PoseSink};
use crate::protocol::constants::SERVO_IDS;
use crate::protocol::{build_stop_command, JointAngle, ProtocolFrame, ServoId, ServoValue, TxFrame};
use crate::transport::{SessionOptions, Transport, TransportSession};
use std::time::Duration;

/// Current value of each of the 25 servos, in protocol order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServoTable {
    servos: Vec<(ServoId, ServoValue)>,
}

impl ServoTable {
    /// Every servo at center
    pub fn new() -> Self {
        Self {
            servos: SERVO_IDS.iter().map(|&id| (id, ServoValue::CENTER)).collect(),
        }
    }

    pub fn get(&self, id: ServoId) -> Option<ServoValue> {
        self.servos.iter().find(|(sid, _)| *sid == id).map(|&(_, v)| v)
    }

    /// Set a raw value, clamped into range; `false` for an unknown id
    pub fn set_value(&mut self, id: ServoId, raw: i32) -> bool {
        self.set(id, ServoValue::clamped(raw))
    }

    /// Set a joint angle in degrees; `false` for an unknown id
    pub fn set_angle(&mut self, id: ServoId, angle: JointAngle) -> bool {
        self.set(id, ServoValue::from_angle(angle))
    }

    fn set(&mut self, id: ServoId, value: ServoValue) -> bool {
        match self.servos.iter_mut().find(|(sid, _)| *sid == id) {
            Some(slot) => {
                slot.1 = value;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ServoId, ServoValue)> + '_ {
        self.servos.iter().copied()
    }

    /// Back to center
    pub fn reset(&mut self) {
        for slot in &mut self.servos {
            slot.1 = ServoValue::CENTER;
        }
    }

    /// Pose command carrying every servo
    pub fn to_frame(&self, speed: u8) -> Result<TxFrame> {
        let mut frame = TxFrame::new();
        frame.set_pose(self.iter(), speed)?;
        Ok(frame)
    }
}

impl Default for ServoTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseSink for ServoTable {
    fn apply_servo_angle(&mut self, servo_id: ServoId, angle: JointAngle) {
        if !self.set_angle(servo_id, angle) {
            log::trace!("Ignoring unknown servo id {:02X}", servo_id);
        }
    }
}

type ModeCallback = Box<dyn FnMut(bool) + Send>;
type FrameCallback = Box<dyn FnMut(&ProtocolFrame) + Send>;

/// Sends the servo table to the robot
pub struct PoseController {
    servos: ServoTable,
    session: Option<TransportSession>,
    options: SessionOptions,
    config: ControllerConfig,
    continuous: bool,
    timer: Duration,
    on_continuous_change: Option<ModeCallback>,
    on_frame: Option<FrameCallback>,
}

impl PoseController {
    pub fn new(config: ControllerConfig, options: SessionOptions) -> Self {
        Self {
            servos: ServoTable::new(),
            session: None,
            options,
            config,
            continuous: false,
            timer: Duration::ZERO,
            on_continuous_change: None,
            on_frame: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.controller, SessionOptions::from_config(config))
    }

    pub fn servos(&self) -> &ServoTable {
        &self.servos
    }

    pub fn servos_mut(&mut self) -> &mut ServoTable {
        &mut self.servos
    }

    /// Load a pose into the servo table
    pub fn set_pose(&mut self, pose: &Pose) {
        pose.apply_to(&mut self.servos);
    }

    /// Called with the new state whenever continuous mode changes
    pub fn on_continuous_change<F: FnMut(bool) + Send + 'static>(&mut self, callback: F) {
        self.on_continuous_change = Some(Box::new(callback));
    }

    /// Called for each inbound frame; without one, frames are logged
    pub fn on_frame<F: FnMut(&ProtocolFrame) + Send + 'static>(&mut self, callback: F) {
        self.on_frame = Some(Box::new(callback));
    }

    /// Start a session on `transport`, closing any previous one
    pub fn open(&mut self, transport: Box<dyn Transport>) -> Result<()> {
        self.close()?;
        self.session = Some(TransportSession::open(transport, self.options)?);
        Ok(())
    }

    pub fn open_serial(&mut self, serial: &SerialConfig) -> Result<()> {
        self.close()?;
        self.session = Some(TransportSession::open_serial(serial, self.options)?);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.session.as_ref().is_some_and(TransportSession::is_open)
    }

    /// Close the session; queued commands are still sent
    pub fn close(&mut self) -> Result<()> {
        match self.session.take() {
            Some(session) => session.close(),
            None => Ok(()),
        }
    }

    fn session(&self) -> Result<&TransportSession> {
        self.session.as_ref().ok_or(Error::TransportClosed)
    }

    /// Send the current servo table as one pose command
    pub fn apply_pose(&self) -> Result<()> {
        let session = self.session()?;
        let frame = self.servos.to_frame(self.config.pose_speed)?;
        session.submit_frame(&frame)
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    pub fn set_continuous_mode(&mut self, enabled: bool) {
        log::info!("Continuous mode: {}", enabled);
        self.continuous = enabled;
        if enabled {
            self.timer = Duration::ZERO;
        }
        if let Some(callback) = self.on_continuous_change.as_mut() {
            callback(enabled);
        }
    }

    /// Relax every servo
    ///
    /// Continuous mode is switched off first so that no pose command follows
    /// the stop.
    pub fn force_all_stop(&mut self) -> Result<()> {
        self.set_continuous_mode(false);
        self.session()?.submit_frame(&build_stop_command())
    }

    /// Advance by `dt`: surface errors and inbound frames, and in continuous
    /// mode send the pose once per interval
    pub fn update(&mut self, dt: Duration) -> Result<()> {
        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };

        for e in session.drain_errors() {
            log::error!("Transport error: {}", e);
        }
        for frame in session.drain_frames() {
            match self.on_frame.as_mut() {
                Some(callback) => callback(&frame),
                None => log::info!("Received: {}", frame),
            }
        }

        if !self.continuous {
            return Ok(());
        }

        self.timer += dt;
        let interval = self.config.continuous_interval();
        if self.timer > interval {
            self.apply_pose()?;
            self.timer -= interval;
        }
        Ok(())
    }
}

impl Drop for PoseController {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("Failed to close pose controller: {}", e);
        }
    }
}
