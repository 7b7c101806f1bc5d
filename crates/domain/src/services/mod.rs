//! Domain services.

pub mod account;
pub mod admin;
pub mod checkout;
pub mod lifecycle;
pub mod messaging;
pub mod notification;
pub mod payment;
pub mod policy;
pub mod recommendation;

pub use account::AccountService;
pub use admin::AdminService;
pub use lifecycle::{CheckoutUrls, LifecycleEngine, PaymentOutcome};
pub use notification::{MockNotificationSender, Notification, NotificationResult, NotificationSender};
pub use payment::{MockPaymentGateway, PaymentGateway};
