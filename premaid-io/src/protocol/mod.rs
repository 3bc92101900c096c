//! PreMaid AI wire protocol
//!
//! Serial link: 115200 baud, 8-N-1.
//!
//! - **Outbound**: `50 18 00 <speed> {25 x (id, hb, lb)} <xor>` built by [`TxFrame`]
//! - **Inbound**: length-prefixed token stream cut into [`ProtocolFrame`]s by
//!   [`FrameReassembler`]
//!
//! Servo values and angles are converted by [`servo`].

pub mod constants;
pub mod frame;
pub mod reassembler;
mod ring_buffer;
pub mod servo;

pub use frame::{
    build_pose_command, build_stop_command, bytes_from_hex, checksum, hex_string,
    verify_checksum, ProtocolFrame, TxFrame,
};
pub use reassembler::FrameReassembler;
pub use servo::{JointAngle, ServoId, ServoValue};
