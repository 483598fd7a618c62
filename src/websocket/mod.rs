//! WebSocket Real-Time Streaming
//!
//! Receives readings from browser clients and mirrors them, together with
//! alerts, to every connected viewer.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Actor owning connection membership and fan-out
//! - **Connection**: What the hub needs from a peer (send, close)
//! - **Handler**: Handles WebSocket upgrade and the per-connection read loop
//! - **Messages**: Outbound frame formats
//!
//! ## Usage
//!
//! Clients connect to `/ws` and send one JSON reading per frame. Every
//! client receives every classified reading and every alert.
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:8080/ws');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({
//!     timestamp: performance.now(),
//!     confidence: 0.97,
//!     emotions: { happy: 0.8, neutral: 0.15, sad: 0.05 },
//!   }));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'alert') console.warn(msg.level, msg.message);
//! };
//! ```

mod connection;
mod handler;
mod hub;
mod messages;

pub use connection::{Connection, ConnectionError};
pub use handler::websocket_handler;
pub use hub::{ConnectionHub, ConnectionId, HubConfig, HubError};
pub use messages::OutboundMessage;

#[cfg(test)]
pub(crate) use hub::tests::MockConnection;
