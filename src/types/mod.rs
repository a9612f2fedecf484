pub mod constants;
mod id;
mod index;
mod resources;
mod selector;

pub use constants::*;
pub use id::new_id;
pub use index::{INDEX_API_VERSION, IndexApplication, IndexChartVersion, SavedIndex};
pub use resources::*;
pub use selector::LabelSelector;
