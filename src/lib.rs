//! Easel - Slack text-to-image relay
//!
//! Slack users type `!-prompt "a lighthouse at dusk"` in a channel and get
//! back an image generated by Amazon Titan on Bedrock.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  signed event   ┌──────────────────────┐
//! │    Slack     │ ──────────────▶ │   Webhook receiver   │
//! │              │  200 (< 3s)     │  verify, filter      │
//! │              │ ◀────────────── │                      │
//! │              │                 └──────────┬───────────┘
//! │              │                            │ dispatch (fire-and-forget)
//! │              │                 ┌──────────▼───────────┐
//! │              │  status + file  │        Worker        │
//! │              │ ◀────────────── │  parse, generate,    │
//! └──────────────┘                 │  upload              │
//!                                  └──────────┬───────────┘
//!                                             │ InvokeModel
//!                                  ┌──────────▼───────────┐
//!                                  │   Bedrock (Titan)    │
//!                                  └──────────────────────┘
//! ```
//!
//! The receiver and worker can share a process ([`dispatch::LocalDispatcher`])
//! or run as separate deployments ([`dispatch::HttpDispatcher`]).

pub mod api;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod slack;
pub mod worker;

pub use config::Config;
pub use dispatch::{Dispatcher, ForwardedCommand};
pub use error::{Error, Result};
pub use model::{GeneratedImage, GenerationRequest, ImageGenerator};
pub use worker::{WorkOutcome, Worker};
