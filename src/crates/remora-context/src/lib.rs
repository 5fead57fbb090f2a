mod action;
mod builder;

pub use action::RecentAction;
pub use builder::{ContextBuilder, ContextConfig, RelatedCodeStore};
