//! Inquiry conversations between clients and vendors.

use uuid::Uuid;
use validator::Validate;

use super::lifecycle::LifecycleEngine;
use super::notification::{dispatch, Notification};
use super::policy;
use crate::error::{DomainError, DomainResult};
use crate::models::inquiry::{AppendMessageRequest, CreateInquiryRequest};
use crate::models::{
    AuthContext, Inquiry, NewInquiry, NewMessage, Provider, SenderRole, UserRole,
};

const PREVIEW_CHARS: usize = 140;

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        out.push('…');
    }
    out
}

impl LifecycleEngine {
    async fn caller_name(&self, caller: &AuthContext) -> DomainResult<String> {
        self.stores
            .users
            .find_user(caller.user_id)
            .await?
            .map(|u| u.display_name)
            .ok_or(DomainError::Unauthorized)
    }

    async fn load_inquiry(&self, id: Uuid) -> DomainResult<(Inquiry, Provider)> {
        let inquiry = self
            .stores
            .inquiries
            .find_inquiry(id)
            .await?
            .ok_or(DomainError::NotFound("Inquiry"))?;
        let provider = self.load_provider(inquiry.provider_id).await?;
        Ok((inquiry, provider))
    }

    /// Opens an inquiry with a published provider.
    pub async fn create_inquiry(
        &self,
        caller: &AuthContext,
        request: CreateInquiryRequest,
    ) -> DomainResult<Inquiry> {
        policy::require_role(caller, UserRole::Client)?;
        request.validate()?;

        let provider = self
            .stores
            .providers
            .find_provider(request.provider_id)
            .await?
            .filter(|p| p.is_published)
            .ok_or(DomainError::NotFound("Provider"))?;

        let from_name = self.caller_name(caller).await?;

        let inquiry = self
            .stores
            .inquiries
            .create_inquiry(NewInquiry {
                from_user_id: caller.user_id,
                from_name: from_name.clone(),
                provider_id: provider.id,
                event_date: request.event_date,
                first_message: NewMessage {
                    sender_role: SenderRole::Client,
                    sender_name: from_name.clone(),
                    sender_id: caller.user_id,
                    text: request.message.clone(),
                },
            })
            .await?;

        tracing::info!(
            inquiry_id = %inquiry.id,
            provider_id = %provider.id,
            "Inquiry opened"
        );

        self.notify_message(&inquiry, &provider, SenderRole::Client, from_name, &request.message);
        Ok(inquiry)
    }

    /// Reads an inquiry with its messages.
    pub async fn get_inquiry(&self, caller: &AuthContext, inquiry_id: Uuid) -> DomainResult<Inquiry> {
        let (inquiry, provider) = self.load_inquiry(inquiry_id).await?;
        policy::inquiry_party(caller, &inquiry, &provider).ok_or(DomainError::Forbidden)?;
        Ok(inquiry)
    }

    /// Appends a message to the thread. The sender role and name come from
    /// the caller, never from the request.
    pub async fn append_message(
        &self,
        caller: &AuthContext,
        inquiry_id: Uuid,
        request: AppendMessageRequest,
    ) -> DomainResult<Inquiry> {
        let (inquiry, provider) = self.load_inquiry(inquiry_id).await?;
        let role =
            policy::inquiry_party(caller, &inquiry, &provider).ok_or(DomainError::Forbidden)?;
        request.validate()?;

        let sender_name = match role {
            SenderRole::Vendor => provider.business_name.clone(),
            SenderRole::Client | SenderRole::Admin => self.caller_name(caller).await?,
        };

        let updated = self
            .stores
            .inquiries
            .append_message(
                inquiry_id,
                NewMessage {
                    sender_role: role,
                    sender_name: sender_name.clone(),
                    sender_id: caller.user_id,
                    text: request.text.clone(),
                },
            )
            .await?
            .ok_or(DomainError::NotFound("Inquiry"))?;

        tracing::info!(
            inquiry_id = %inquiry_id,
            sender_role = %role,
            message_count = updated.messages.len(),
            "Message appended"
        );

        self.notify_message(&updated, &provider, role, sender_name, &request.text);
        Ok(updated)
    }

    /// Notifies the other side of the conversation; admin messages go to
    /// both sides.
    fn notify_message(
        &self,
        inquiry: &Inquiry,
        provider: &Provider,
        sender: SenderRole,
        from_name: String,
        text: &str,
    ) {
        let stores = self.stores.clone();
        let inquiry_id = inquiry.id;
        let client_id = inquiry.from_user_id;
        let client_name = inquiry.from_name.clone();
        let owner_id = provider.owner_user_id;
        let business_name = provider.business_name.clone();
        let preview = preview(text);

        dispatch(self.notifier.clone(), async move {
            let mut recipients = Vec::new();
            if sender != SenderRole::Client {
                if let Some(client) = stores.users.find_user(client_id).await? {
                    recipients.push((client.email, client_name));
                }
            }
            if sender != SenderRole::Vendor {
                if let Some(owner) = stores.users.find_user(owner_id).await? {
                    recipients.push((owner.email, business_name));
                }
            }
            Ok(recipients
                .into_iter()
                .map(|(to_email, to_name)| Notification::NewMessage {
                    to_email,
                    to_name,
                    inquiry_id,
                    from_name: from_name.clone(),
                    preview: preview.clone(),
                })
                .collect())
        });
    }
}
