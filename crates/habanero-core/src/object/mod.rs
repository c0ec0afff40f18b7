//! Business objects and the identity map that owns them.

mod business_object;
mod identity_map;
mod props;

pub use business_object::{BoStatus, BusinessObject};
pub use identity_map::IdentityMap;
pub use props::BoProp;
