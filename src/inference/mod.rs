pub(crate) mod extract;
pub(crate) mod features;
pub(crate) mod model;
pub(crate) mod session;
