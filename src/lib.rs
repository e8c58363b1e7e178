//! Recap - screen + microphone recording in one MP4.
//!
//! Two independently-timed producers (a screen frame grabber and an audio
//! block grabber) run on their own threads, feed an H.264 and an AAC
//! encoder, and interleave their packets into a single container under one
//! write lock. A shared monotonic clock gives both streams a common origin;
//! a cooperative running flag is the only stop signal; teardown flushes the
//! encoders and closes the container before releasing the devices.
//!
//! The front end (region picker, buttons) is out of scope: callers hand a
//! [`SessionConfig`] to [`Recorder::start`] and later call
//! [`Recorder::stop`].

pub mod capture;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod muxer;
pub mod session;

pub use config::{CaptureRegion, SessionConfig};
pub use error::{RecorderError, RecorderResult};
pub use session::{Recorder, SessionSummary};
