//! Landmark streaming client
//!
//! The client side of the socket: a self-healing channel to the backend, the
//! router applying backend pushes to the page, the encoder packaging detection
//! frames, and the session loop tying them to the detector and the 3D grid.

pub mod channel;
pub mod encoder;
pub mod endpoint;
pub mod router;
pub mod session;
pub mod ui;

pub use channel::{Channel, ChannelManager, ChannelSettings, ConnectionHandle, ConnectionState, SendOutcome};
pub use encoder::encode;
pub use endpoint::{socket_endpoint, SOCKET_PATH};
pub use router::{route, RouteOutcome};
pub use session::{ClientSession, SessionStats};
pub use ui::{UiModel, UiSurface};
