pub use super::leads::Entity as Leads;
pub use super::payout_exceptions::Entity as PayoutExceptions;
pub use super::postback_configurations::Entity as PostbackConfigurations;
pub use super::postback_notifications::Entity as PostbackNotifications;
pub use super::products::Entity as Products;
pub use super::users::Entity as Users;
