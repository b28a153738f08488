pub mod assessment;
pub mod credential;
pub mod enums;
pub mod filters;
pub mod schedule;
pub mod staff;

pub use assessment::*;
pub use credential::*;
pub use filters::*;
pub use schedule::*;
pub use staff::*;
