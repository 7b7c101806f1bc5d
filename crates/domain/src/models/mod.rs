//! Domain models for the Event Marketplace.

pub mod booking;
pub mod checkout;
pub mod culture_tag;
pub mod inquiry;
pub mod provider;
pub mod quote;
pub mod recommendation;
pub mod token;
pub mod user;

pub use booking::{Booking, BookingFilter, BookingStatus, NewBooking};
pub use checkout::InitiateCheckoutRequest;
pub use culture_tag::CultureTraditionTag;
pub use inquiry::{Inquiry, InquiryStatus, Message, NewInquiry, NewMessage, SenderRole};
pub use provider::{CascadeReport, Listing, Provider, ProviderDependent, ProviderSummary};
pub use quote::{NewQuote, Quote, QuoteAcceptance, QuoteAction, QuoteDecline, QuoteStatus};
pub use recommendation::NearbyQuery;
pub use token::{SingleUseToken, TokenPurpose};
pub use user::{AuthContext, NewUser, User, UserRole};
