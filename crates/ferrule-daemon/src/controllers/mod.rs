// crates/ferrule-daemon/src/controllers/mod.rs
//
// Controllers exposed by the example daemon.

pub mod math;
pub mod users;

pub use math::MathController;
pub use users::UsersController;
