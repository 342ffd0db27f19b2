mod helpers;
mod resource;

pub use helpers::*;
pub use resource::TestResource;
