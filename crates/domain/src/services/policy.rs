//! Authorization policy.
//!
//! Every capability decision for inquiries, quotes, bookings and providers
//! lives here. Handlers pass the verified [`AuthContext`] in explicitly.

use crate::error::{DomainError, DomainResult};
use crate::models::{AuthContext, Booking, Inquiry, Provider, Quote, SenderRole, UserRole};

/// The role the caller plays in an inquiry conversation, if any.
///
/// Being the client or the vendor takes precedence over being an
/// administrator.
pub fn inquiry_party(
    caller: &AuthContext,
    inquiry: &Inquiry,
    provider: &Provider,
) -> Option<SenderRole> {
    if inquiry.from_user_id == caller.user_id {
        Some(SenderRole::Client)
    } else if provider.owner_user_id == caller.user_id {
        Some(SenderRole::Vendor)
    } else if caller.is_admin() {
        Some(SenderRole::Admin)
    } else {
        None
    }
}

/// Whether the caller may accept or decline the quote.
pub fn can_respond_to_quote(caller: &AuthContext, quote: &Quote) -> bool {
    caller.is_admin() || quote.client_user_id == Some(caller.user_id)
}

/// Whether the caller may act on behalf of the provider.
pub fn can_manage_provider(caller: &AuthContext, provider: &Provider) -> bool {
    caller.is_admin() || provider.owner_user_id == caller.user_id
}

/// Whether the caller may see the booking.
pub fn can_view_booking(caller: &AuthContext, booking: &Booking, provider: &Provider) -> bool {
    booking.client_user_id == Some(caller.user_id) || can_manage_provider(caller, provider)
}

/// Requires the caller to hold exactly `role`.
pub fn require_role(caller: &AuthContext, role: UserRole) -> DomainResult<()> {
    if caller.role == role {
        Ok(())
    } else {
        Err(DomainError::Unauthorized)
    }
}

/// Requires an administrator.
pub fn require_admin(caller: &AuthContext) -> DomainResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(DomainError::Forbidden)
    }
}
