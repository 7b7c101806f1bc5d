//! Moderation operations. Every method requires an administrator.

use uuid::Uuid;
use validator::Validate;

use super::policy::require_admin;
use crate::error::{DomainError, DomainResult};
use crate::models::booking::{
    AdminCreateBookingRequest, BookingFilter, BookingPage, UpdateBookingStatusRequest,
};
use crate::models::culture_tag::{CreateCultureTagRequest, UpdateCultureTagRequest};
use crate::models::{
    AuthContext, Booking, BookingStatus, CascadeReport, CultureTraditionTag, NewBooking,
};
use crate::ports::{StoreError, Stores};

pub struct AdminService {
    stores: Stores,
}

impl AdminService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Removes a provider and everything that hangs off it.
    pub async fn delete_provider(
        &self,
        caller: &AuthContext,
        provider_id: Uuid,
    ) -> DomainResult<CascadeReport> {
        require_admin(caller)?;

        let report = self
            .stores
            .providers
            .delete_provider_cascade(provider_id)
            .await
            .map_err(|e| {
                tracing::error!(provider_id = %provider_id, error = %e, "Provider cascade failed");
                DomainError::from(e)
            })?
            .ok_or(DomainError::NotFound("Provider"))?;

        tracing::info!(
            provider_id = %provider_id,
            deleted_by = %caller.user_id,
            rows = report.total_rows(),
            "Provider deleted"
        );
        Ok(report)
    }

    pub async fn list_bookings(
        &self,
        caller: &AuthContext,
        filter: BookingFilter,
    ) -> DomainResult<BookingPage> {
        require_admin(caller)?;
        filter.validate()?;

        let (bookings, total) = self.stores.bookings.list_bookings(&filter).await?;
        Ok(BookingPage {
            bookings,
            total,
            page: filter.page,
            per_page: filter.per_page,
        })
    }

    pub async fn create_booking(
        &self,
        caller: &AuthContext,
        request: AdminCreateBookingRequest,
    ) -> DomainResult<Booking> {
        require_admin(caller)?;
        request.validate()?;
        if request.total_amount.is_sign_negative() && !request.total_amount.is_zero() {
            return Err(DomainError::invalid_field(
                "totalAmount",
                "Total amount must not be negative",
            ));
        }

        let provider = self
            .stores
            .providers
            .find_provider(request.provider_id)
            .await?
            .ok_or(DomainError::NotFound("Provider"))?;

        let booking = self
            .stores
            .bookings
            .create_booking(NewBooking {
                provider_id: provider.id,
                client_user_id: request.client_user_id,
                quote_id: None,
                event_date: request.event_date,
                status: request.status.unwrap_or(BookingStatus::Confirmed),
                total_amount: request.total_amount,
                currency: request.currency.unwrap_or(provider.currency),
                payment_session_id: None,
                paid_at: None,
                contact_name: request.contact_name,
                contact_email: request.contact_email,
                contact_phone: request.contact_phone,
                listing_ids: request.listing_ids,
            })
            .await?;

        tracing::info!(booking_id = %booking.id, created_by = %caller.user_id, "Booking created by admin");
        Ok(booking)
    }

    pub async fn set_booking_status(
        &self,
        caller: &AuthContext,
        booking_id: Uuid,
        request: UpdateBookingStatusRequest,
    ) -> DomainResult<Booking> {
        require_admin(caller)?;

        let booking = self
            .stores
            .bookings
            .set_booking_status(booking_id, request.status)
            .await?
            .ok_or(DomainError::NotFound("Booking"))?;

        tracing::info!(
            booking_id = %booking_id,
            status = %booking.status,
            changed_by = %caller.user_id,
            "Booking status overridden"
        );
        Ok(booking)
    }

    pub async fn delete_inquiry(&self, caller: &AuthContext, inquiry_id: Uuid) -> DomainResult<()> {
        require_admin(caller)?;
        if !self.stores.inquiries.delete_inquiry(inquiry_id).await? {
            return Err(DomainError::NotFound("Inquiry"));
        }
        tracing::info!(inquiry_id = %inquiry_id, deleted_by = %caller.user_id, "Inquiry deleted");
        Ok(())
    }

    pub async fn list_culture_tags(
        &self,
        caller: &AuthContext,
    ) -> DomainResult<Vec<CultureTraditionTag>> {
        require_admin(caller)?;
        Ok(self.stores.culture_tags.list_tags(false).await?)
    }

    pub async fn create_culture_tag(
        &self,
        caller: &AuthContext,
        request: CreateCultureTagRequest,
    ) -> DomainResult<CultureTraditionTag> {
        require_admin(caller)?;
        request.validate()?;

        self.stores
            .culture_tags
            .create_tag(&request)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => DomainError::Conflict(format!(
                    "A tag with slug '{}' already exists",
                    request.slug
                )),
                other => other.into(),
            })
    }

    pub async fn update_culture_tag(
        &self,
        caller: &AuthContext,
        tag_id: Uuid,
        request: UpdateCultureTagRequest,
    ) -> DomainResult<CultureTraditionTag> {
        require_admin(caller)?;
        request.validate()?;

        self.stores
            .culture_tags
            .update_tag(tag_id, &request)
            .await?
            .ok_or(DomainError::NotFound("Culture tag"))
    }

    /// Active tags for the public catalogue. No authorization.
    pub async fn active_culture_tags(&self) -> DomainResult<Vec<CultureTraditionTag>> {
        Ok(self.stores.culture_tags.list_tags(true).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderDependent;
    use crate::ports::ProviderStore;
    use crate::test_support::{ctx, listing, Harness};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    async fn with_dependents(h: &Harness) {
        h.store
            .insert_listing(listing(&h.provider, "Buffet", dec!(500)))
            .await;
        for kind in [
            ProviderDependent::Payouts,
            ProviderDependent::Reviews,
            ProviderDependent::Reviews,
            ProviderDependent::Favorites,
            ProviderDependent::TeamMembers,
            ProviderDependent::WeeklySchedules,
        ] {
            h.store.insert_dependent(kind, h.provider.id).await;
        }
    }

    fn booking_request(h: &Harness, day: u32) -> AdminCreateBookingRequest {
        AdminCreateBookingRequest {
            provider_id: h.provider.id,
            client_user_id: Some(h.client.id),
            event_date: NaiveDate::from_ymd_opt(2030, 6, day).unwrap(),
            status: None,
            total_amount: dec!(750),
            currency: None,
            contact_name: Some("Ana".into()),
            contact_email: Some("ana@example.com".into()),
            contact_phone: None,
            listing_ids: vec![],
        }
    }

    #[tokio::test]
    async fn test_delete_provider_removes_every_dependent() {
        let h = Harness::new().await;
        with_dependents(&h).await;
        h.admin
            .create_booking(&ctx(&h.admin_user), booking_request(&h, 1))
            .await
            .unwrap();
        assert_eq!(h.store.rows_for_provider(h.provider.id).await, 8);

        let report = h
            .admin
            .delete_provider(&ctx(&h.admin_user), h.provider.id)
            .await
            .unwrap();
        assert_eq!(report.total_rows(), 8);
        assert_eq!(report.deleted.len(), ProviderDependent::ALL.len());
        assert_eq!(h.store.rows_for_provider(h.provider.id).await, 0);
        assert!(h.store.find_provider(h.provider.id).await.unwrap().is_none());

        assert!(matches!(
            h.admin.delete_provider(&ctx(&h.admin_user), h.provider.id).await,
            Err(DomainError::NotFound("Provider"))
        ));
    }

    #[tokio::test]
    async fn test_failed_cascade_leaves_everything_in_place() {
        for failing in [ProviderDependent::Payouts, ProviderDependent::Listings] {
            let h = Harness::new().await;
            with_dependents(&h).await;
            h.store.fail_cascade_on(Some(failing));

            let result = h
                .admin
                .delete_provider(&ctx(&h.admin_user), h.provider.id)
                .await;
            assert!(result.is_err());
            assert_eq!(h.store.rows_for_provider(h.provider.id).await, 7);
            assert!(h.store.find_provider(h.provider.id).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_admin_operations_require_admin() {
        let h = Harness::new().await;
        for caller in [&h.client, &h.vendor] {
            assert!(matches!(
                h.admin.delete_provider(&ctx(caller), h.provider.id).await,
                Err(DomainError::Forbidden)
            ));
            assert!(matches!(
                h.admin.list_bookings(&ctx(caller), BookingFilter::default()).await,
                Err(DomainError::Forbidden)
            ));
        }
        assert!(h.store.find_provider(h.provider.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_bookings_filters_and_pages() {
        let h = Harness::new().await;
        let admin = ctx(&h.admin_user);
        for day in 1..=5 {
            h.admin
                .create_booking(&admin, booking_request(&h, day))
                .await
                .unwrap();
        }
        let mut pending = booking_request(&h, 10);
        pending.status = Some(BookingStatus::PendingPayment);
        h.admin.create_booking(&admin, pending).await.unwrap();

        let page = h
            .admin
            .list_bookings(
                &admin,
                BookingFilter {
                    status: Some(BookingStatus::Confirmed),
                    page: 2,
                    per_page: 2,
                    ..BookingFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        let days: Vec<_> = page.bookings.iter().map(|b| b.event_date.to_string()).collect();
        assert_eq!(days, vec!["2030-06-03", "2030-06-02"]);
        assert!(page.bookings.iter().all(|b| b.currency == "usd"));

        let inverted = BookingFilter {
            from: NaiveDate::from_ymd_opt(2030, 7, 1),
            to: NaiveDate::from_ymd_opt(2030, 6, 1),
            ..BookingFilter::default()
        };
        assert!(matches!(
            h.admin.list_bookings(&admin, inverted).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_status_override() {
        let h = Harness::new().await;
        let admin = ctx(&h.admin_user);
        let booking = h
            .admin
            .create_booking(&admin, booking_request(&h, 1))
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);

        let cancelled = h
            .admin
            .set_booking_status(
                &admin,
                booking.id,
                UpdateBookingStatusRequest {
                    status: BookingStatus::Cancelled,
                },
            )
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        assert!(matches!(
            h.admin
                .set_booking_status(
                    &admin,
                    Uuid::new_v4(),
                    UpdateBookingStatusRequest {
                        status: BookingStatus::Cancelled
                    }
                )
                .await,
            Err(DomainError::NotFound("Booking"))
        ));
    }

    #[tokio::test]
    async fn test_culture_tags() {
        let h = Harness::new().await;
        let admin = ctx(&h.admin_user);
        let tag = |name: &str, slug: &str, order: i32| CreateCultureTagRequest {
            name: name.to_string(),
            slug: slug.to_string(),
            display_order: order,
            is_active: true,
        };

        let hindu = h
            .admin
            .create_culture_tag(&admin, tag("Hindu", "hindu", 2))
            .await
            .unwrap();
        h.admin
            .create_culture_tag(&admin, tag("Jewish", "jewish", 1))
            .await
            .unwrap();
        assert!(matches!(
            h.admin.create_culture_tag(&admin, tag("Hindu 2", "hindu", 3)).await,
            Err(DomainError::Conflict(_))
        ));

        h.admin
            .update_culture_tag(
                &admin,
                hindu.id,
                UpdateCultureTagRequest {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let public: Vec<_> = h
            .admin
            .active_culture_tags()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.slug)
            .collect();
        assert_eq!(public, vec!["jewish"]);

        let all: Vec<_> = h
            .admin
            .list_culture_tags(&admin)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.slug)
            .collect();
        assert_eq!(all, vec!["jewish", "hindu"]);
    }
}
