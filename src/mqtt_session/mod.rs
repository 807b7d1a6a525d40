// SPDX-License-Identifier: MPL-2.0

pub mod session;
pub mod store;

pub use session::ClientSession;
pub use store::{InboundPublishOutcome, SessionError, SessionState};
