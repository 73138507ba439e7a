pub mod app;
pub mod build;
pub mod droplet;
pub mod error;
pub mod page;
pub mod relationship;

pub use app::*;
pub use build::*;
pub use droplet::*;
pub use error::*;
pub use page::*;
pub use relationship::*;
