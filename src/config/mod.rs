//! Configuration module

mod notion;
mod site;

pub use notion::normalize_id;
pub use notion::NotionConfig;
pub use notion::PropertyNames;
pub use notion::SlugFilter;
pub use site::NavLink;
pub use site::SiteConfig;
