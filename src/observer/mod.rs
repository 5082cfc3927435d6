// Observer system: every generic record write passes through a ring-ordered pipeline

pub mod context;
pub mod error;
pub mod implementations;
pub mod pipeline;
pub mod traits;

pub use context::ObserverContext;
pub use error::{ObserverError, ObserverWarning};
pub use pipeline::ObserverPipeline;
pub use traits::{Observer, ObserverRing};
