//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod booking;
pub mod culture_tag;
pub mod inquiry;
pub mod provider;
pub mod quote;
pub mod user;

pub use booking::{BookingEntity, BookingStatusDb};
pub use culture_tag::CultureTagEntity;
pub use inquiry::{InquiryEntity, InquiryStatusDb, MessageEntity, SenderRoleDb};
pub use provider::{ListingEntity, NearbyProviderEntity, ProviderEntity};
pub use quote::{QuoteEntity, QuoteStatusDb};
pub use user::{SingleUseTokenEntity, UserEntity, UserRoleDb};
