mod types;

pub use types::{AuditorConfig, EntraConfig};
