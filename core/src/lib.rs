//! Client-side data layer for the quiz question service.
//!
//! # Overview
//! Keeps an in-memory list of questions in sync with a remote HTTP
//! collection and exposes it to a presentation layer.
//!
//! # Design
//! - `QuestionGateway` is stateless. It builds `HttpRequest` values and
//!   parses `HttpResponse` values; a `Transport` performs the round-trip.
//! - `QuestionStore` owns the collection, the busy flag and the last error.
//!   All mutation happens on a single actor task and is published through a
//!   `watch` channel.
//! - The gateway is built once (see `GatewayConfig::connect`) and injected
//!   into the store.

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod store;
pub mod transport;
pub mod types;

pub use config::GatewayConfig;
pub use error::{ErrorKind, GatewayError};
pub use gateway::QuestionGateway;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use store::{LastError, Operation, QuestionStore, StoreState};
pub use transport::{ReqwestTransport, Transport, TransportError};
pub use types::{Choice, InvalidQuestion, Question, QuestionDraft, QuestionId};
