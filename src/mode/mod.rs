//! Controller modes
//!
//! Exactly one mode is active at a time. Held gestures switch between them
//! and blinks leave gaze mode.
//!
//! ```text
//!              One (T1)                      capture started
//! ┌──────┐ ─────────────► ┌──────────────┐ ─────────────────► ┌────────────────┐
//! │ IDLE │                │ VOICE_PENDING│                    │ VOICE_RECORDING│
//! └──────┘ ◄───────────── └──────────────┘ ◄───────────────── └────────────────┘
//!    ▲  │      One (T1)          │           result delivered          │
//!    │  │                        │ Two (T2)                   Two (T2) │
//!    │  │ Two (T2)               ▼                                     │
//!    │  └──────────────────► ┌─────────────┐ ◄───────────────────────────┘
//!    │                       │ GAZE_ACTIVE │
//!    └───────────────────────└─────────────┘
//!      double blink, or blink then pinch
//! ```
//!
//! `One` held in gaze switches straight to voice, and `Two` held in voice
//! switches straight to gaze.

pub mod hold;
pub mod state;

pub use hold::HoldTimer;
pub use state::{
    ModeSettings, ModeState, ModeStateMachine, ModeUpdate, TransitionReason, TransitionResult,
};
