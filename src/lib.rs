pub mod engine;
pub mod error;
pub mod handler;
pub mod input;
pub mod model;
pub mod output;
pub mod server;
pub mod tls;
pub mod util;

pub use engine::{Engine, TargetProber};
pub use error::{Error, InvalidTarget, ProbeError};
pub use handler::Handler;
pub use model::{ProbeConfig, RawResponse, Target};
