//! Watch events and their wire mapping.
//!
//! - [`Event`]: one change reported by a watch
//! - [`EventCodec`]: converts events to and from [`WireEvent`](crate::transport::WireEvent)s
//!
//! ## Arm order
//!
//! A wire event carries its resource in one arm of a oneof. Arms map to
//! kinds as follows:
//!
//! | Arm                 | Kind                                 |
//! |---------------------|--------------------------------------|
//! | `resource_header`   | any (header only)                    |
//! | `user`              | `user`                               |
//! | `role`              | `role`                               |
//! | `app_session`       | `web_session` with sub-kind `app_session` |
//! | `reverse_tunnel`    | `reverse_tunnel`                     |
//! | `tunnel_connection` | `tunnel_connection`                  |
//! | `access_request`    | `access_request`                     |

mod codec;
mod event;

pub use codec::EventCodec;
pub use event::{Event, OpType};
