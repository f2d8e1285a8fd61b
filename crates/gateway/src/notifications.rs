//! Processors for HSS-initiated notifications.
//!
//! Registration-Termination tears down the affected registration sets:
//! select them from the cache, tell the router to drop the bindings,
//! delete the cached data, answer the HSS. Push-Profile applies new
//! subscription XML and/or charging addresses across the private
//! identity's whole subscription.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use cx_cache::CacheProcessor;
use cx_domain::trace::TraceEvent;
use cx_hss::notifications::{
    DeregistrationReason, HssNotificationHandler, PushProfile, PushProfileAnswer,
    RegistrationTermination, RegistrationTerminationAnswer,
};
use cx_subscription::xml;

use crate::notifier::RouterNotifier;

pub struct NotificationProcessor {
    cache: Arc<CacheProcessor>,
    router: Arc<dyn RouterNotifier>,
}

impl NotificationProcessor {
    pub fn new(cache: Arc<CacheProcessor>, router: Arc<dyn RouterNotifier>) -> Self {
        Self { cache, router }
    }
}

#[async_trait]
impl HssNotificationHandler for NotificationProcessor {
    async fn registration_termination(
        &self,
        request: RegistrationTermination,
        trail: Uuid,
    ) -> RegistrationTerminationAnswer {
        use DeregistrationReason::*;

        let reason = request.reason;
        let mut impis = vec![request.impi.clone()];
        impis.extend(request.associated_impis.iter().cloned());

        tracing::info!(%trail, reason = reason.code(), "received registration-termination request");

        // An explicit public-identity list is only honoured for
        // permanent-termination and remove-S-CSCF; a server change or
        // reassignment always clears everything the IMPIs own.
        let impus = match reason {
            ServerChange | NewServerAssigned => Vec::new(),
            _ => request.impus.clone(),
        };

        let reg_sets = if impus.is_empty()
            && matches!(
                reason,
                PermanentTermination | RemoveScscf | ServerChange | NewServerAssigned
            ) {
            tracing::debug!(%trail, impis = %impis.join(", "), "looking up registration sets by IMPI");
            self.cache.get_irs_for_impis(impis.clone(), trail).await
        } else if !impus.is_empty() && matches!(reason, PermanentTermination | RemoveScscf) {
            tracing::debug!(%trail, impus = %impus.join(", "), "looking up registration sets by IMPU");
            self.cache.get_irs_for_impus(impus, trail).await
        } else {
            tracing::error!(
                %trail,
                reason = reason.code(),
                "registration-termination with invalid deregistration reason"
            );
            return answer_rtr(RegistrationTerminationAnswer::failure(impis));
        };

        let reg_sets = match reg_sets {
            Ok(sets) => sets,
            Err(e) => {
                tracing::warn!(%trail, error = %e, "failed to get registration sets");
                return answer_rtr(RegistrationTerminationAnswer::failure(impis));
            }
        };

        if reg_sets.is_empty() {
            tracing::debug!(%trail, "no registered IMPUs to deregister");
            return answer_rtr(RegistrationTerminationAnswer::success(impis));
        }

        let default_impus: Vec<String> = reg_sets
            .iter()
            .map(|irs| irs.default_impu().to_owned())
            .collect();

        // What the router hears depends on the reason: a permanent
        // termination names every (impu, impi) pair; the others clear
        // by public identity, with notifications to the UEs only when
        // they should re-register elsewhere.
        let (send_notifications, body_impis) = match reason {
            PermanentTermination => (false, impis.clone()),
            RemoveScscf | ServerChange => (true, Vec::new()),
            NewServerAssigned | Other(_) => (false, Vec::new()),
        };
        let router_status = self
            .router
            .deregister_bindings(send_notifications, &default_impus, &body_impis, trail)
            .await;

        let router_accepted = matches!(router_status, Ok(200));
        if !router_accepted {
            tracing::warn!(%trail, status = ?router_status, "router rejected deregistration");
        }

        // Clear our cached data regardless; the router's view is what
        // the HSS hears about.
        match self.cache.delete_irs_many(reg_sets, trail).await {
            Ok(completion) => completion.detach(),
            Err(e) => {
                tracing::warn!(%trail, error = %e, "failed to delete registration sets");
            }
        }

        if router_accepted {
            answer_rtr(RegistrationTerminationAnswer::success(impis))
        } else {
            answer_rtr(RegistrationTerminationAnswer::failure(impis))
        }
    }

    async fn push_profile(&self, request: PushProfile, trail: Uuid) -> PushProfileAnswer {
        tracing::info!(%trail, impi = %request.impi, "received push-profile request");

        let (user_data, charging) = (request.user_data, request.charging_addresses);
        if user_data.is_none() && charging.is_none() {
            // Nothing to apply.
            return answer_ppr(PushProfileAnswer::success());
        }

        let mut subscription = match self.cache.get_ims_subscription(&request.impi, trail).await {
            Ok(sub) => sub,
            Err(e) => {
                tracing::warn!(%trail, error = %e, "failed to get IMS subscription");
                return answer_ppr(PushProfileAnswer::failure());
            }
        };

        if let Some(new_xml) = user_data {
            // New subscription XML must not move the default public
            // identity of any set we hold; that is a hard rejection.
            let new_default = xml::get_default_id(&new_xml).unwrap_or_default();
            let Some(irs) = subscription.irs_for_default_impu(&new_default) else {
                tracing::info!(
                    %trail,
                    impi = %request.impi,
                    new_default = %new_default,
                    "push-profile would change a default public identity - reject"
                );
                return answer_ppr(PushProfileAnswer::failure());
            };

            if !xml::get_public_ids(&new_xml)
                .iter()
                .any(|id| id.starts_with("sip:"))
            {
                tracing::error!(%trail, "no SIP URI in implicit registration set");
            }

            // The TTL stays put: only (re)registration refreshes it.
            irs.set_ims_sub_xml(new_xml);
        }

        if let Some(addresses) = charging {
            subscription.set_charging_addrs(&addresses);
        }

        match self.cache.put_ims_subscription(subscription, trail).await {
            Ok(completion) => {
                completion.detach();
                answer_ppr(PushProfileAnswer::success())
            }
            Err(e) => {
                tracing::warn!(%trail, error = %e, "failed to update registration data");
                answer_ppr(PushProfileAnswer::failure())
            }
        }
    }
}

fn answer_rtr(answer: RegistrationTerminationAnswer) -> RegistrationTerminationAnswer {
    TraceEvent::NotificationHandled {
        kind: "RTR".into(),
        result_code: answer.result_code as u32,
    }
    .emit();
    answer
}

fn answer_ppr(answer: PushProfileAnswer) -> PushProfileAnswer {
    TraceEvent::NotificationHandled {
        kind: "PPR".into(),
        result_code: answer.result_code as u32,
    }
    .emit();
    answer
}
