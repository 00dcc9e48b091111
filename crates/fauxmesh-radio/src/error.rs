//! Error types for the emulated radio.
//!
//! The taxonomy separates faults that must stop the whole radio (bad
//! configuration, MQTT transport failure) from per-session faults (stream
//! encode errors) and per-message faults (undecodable frames or envelopes,
//! failed decryption) that are logged and swallowed so one malformed peer
//! cannot impact availability.

use thiserror::Error;

/// Main error type for radio operations.
#[derive(Error, Debug)]
pub enum RadioError {
    // ===== Configuration =====
    /// A required option is missing or malformed; raised before `run` starts.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ===== Transport =====
    /// The MQTT transport failed fatally (connect or subscribe).
    #[error("mqtt transport error: {0}")]
    Transport(String),

    /// An MQTT publish failed; per-message, the caller logs and continues.
    #[error("mqtt publish failed: {0}")]
    Publish(String),

    // ===== Stream protocol =====
    /// A framed payload failed to deserialize. Recoverable: the codec has
    /// already consumed the frame and the stream keeps going.
    #[error("stream frame decode error: {0}")]
    FrameDecode(String),

    /// A payload is too large to fit in one frame.
    #[error("frame payload of {len} bytes exceeds maximum of {max}")]
    FrameTooLarge {
        /// Offending payload size.
        len: usize,
        /// Largest permitted payload size.
        max: usize,
    },

    /// The underlying stream reached end of file; the session ends cleanly.
    #[error("stream closed")]
    StreamClosed,

    // ===== Crypto =====
    /// A key was supplied whose length is not 128/192/256 bits.
    #[error("invalid key length: {len} bytes")]
    InvalidKey {
        /// Offending key length.
        len: usize,
    },

    /// A channel hash was requested for an empty key.
    #[error("channel key cannot be empty")]
    EmptyKey,

    /// Ciphertext failed to decrypt into a well-formed payload.
    #[error("unable to decrypt payload")]
    Decrypt,

    /// A packet carried neither cleartext nor ciphertext.
    #[error("unknown payload type")]
    UnknownPayloadType,

    // ===== Envelope / protobuf =====
    /// A broker-delivered envelope was structurally invalid.
    #[error("malformed service envelope: {0}")]
    MalformedEnvelope(String),

    /// A protobuf message failed to decode.
    #[error("protobuf decode error: {0}")]
    ProtobufDecode(#[from] prost::DecodeError),

    // ===== General =====
    /// The receiving half of a session queue is gone.
    #[error("subscriber channel closed")]
    ChannelClosed,

    /// IO error on a stream or listener.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RadioError {
    /// Whether a session hitting this error should keep its stream open.
    ///
    /// Frame-level decode failures consume the offending frame only; all
    /// other errors tear down the session.
    pub fn is_frame_recoverable(&self) -> bool {
        matches!(
            self,
            RadioError::FrameDecode(_) | RadioError::ProtobufDecode(_)
        )
    }

    /// Whether this error must stop the whole radio rather than a single
    /// session or message.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RadioError::InvalidConfig(_) | RadioError::Transport(_)
        )
    }
}

/// Result type alias for radio operations.
pub type Result<T> = std::result::Result<T, RadioError>;
