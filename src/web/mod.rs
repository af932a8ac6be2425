//! Browser host integration: DOM discovery, canvas embedding, media loading
//! through HTML elements, and the requestAnimationFrame loop.

mod boot;
mod instance;
mod loader;

pub use boot::start;
pub use instance::WebInstance;
pub use loader::WebMediaLoader;
