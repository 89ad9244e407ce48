pub mod change_password;
pub mod me;

pub use change_password::change_password;
pub use me::me;
