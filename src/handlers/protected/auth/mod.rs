mod session;

pub use session::{refresh, whoami};
