/// Signed-in user query
pub mod account;
/// Activity list and mutations
pub mod activities;

pub use account::Account;
pub use activities::Activities;
