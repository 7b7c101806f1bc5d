//! Repository implementations of the domain store ports.

pub mod booking;
pub mod culture_tag;
pub mod inquiry;
pub mod provider;
pub mod quote;
pub mod token;
pub mod user;

use std::sync::Arc;

use domain::ports::Stores;
use sqlx::PgPool;

pub use booking::BookingRepository;
pub use culture_tag::CultureTagRepository;
pub use inquiry::InquiryRepository;
pub use provider::ProviderRepository;
pub use quote::QuoteRepository;
pub use token::TokenRepository;
pub use user::UserRepository;

/// Builds every store over one connection pool.
pub fn postgres_stores(pool: PgPool) -> Stores {
    Stores {
        users: Arc::new(UserRepository::new(pool.clone())),
        providers: Arc::new(ProviderRepository::new(pool.clone())),
        inquiries: Arc::new(InquiryRepository::new(pool.clone())),
        quotes: Arc::new(QuoteRepository::new(pool.clone())),
        bookings: Arc::new(BookingRepository::new(pool.clone())),
        tokens: Arc::new(TokenRepository::new(pool.clone())),
        culture_tags: Arc::new(CultureTagRepository::new(pool)),
    }
}
