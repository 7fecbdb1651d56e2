//! Terms-acceptance gate
//!
//! A party must accept the service terms once, ever. Registration in the
//! ledger doubles as the acceptance record, so a registered party passes
//! the gate without being prompted again.

use mediary_ledger::models::User;
use mediary_types::{ActionerRole, PartyId};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{FlowError, FlowResult, TermsFailure};
use crate::messenger::MessengerError;
use crate::{FlowOrchestrator, ACCEPT_EMOJI, DECLINE_EMOJI};

/// How long a party has to react to the terms prompt.
pub const TERMS_TIMEOUT: Duration = Duration::from_secs(10 * 60);

fn terms_prompt(role: ActionerRole) -> String {
    format!(
        "You are about to take part in an escrow payment as the {role}.\n\
         Before using the escrow service you must accept its terms:\n\
         \n\
          - Deposited funds are held by the service until released, cancelled, or aborted.\n\
          - Moderators may cancel a transaction and return funds to the sender.\n\
          - The service is not liable for addresses you supply incorrectly.\n\
         \n\
         React with \u{2705} to accept or \u{274c} to decline."
    )
}

impl FlowOrchestrator {
    /// Ensure `party` has accepted the terms, prompting them if needed.
    ///
    /// Succeeds immediately for a registered party. Otherwise the party is
    /// DMed the terms and given [`TERMS_TIMEOUT`] to react; accepting
    /// registers them in the ledger. `role` only flavors the prompt.
    pub async fn ensure_accepted_terms(
        &self,
        party: PartyId,
        role: ActionerRole,
    ) -> FlowResult<User> {
        if let Some(user) = self.ledger.users().get(party).await? {
            return Ok(user);
        }

        debug!(%party, %role, "prompting for terms acceptance");

        let message = self
            .messenger
            .send_direct(party, &terms_prompt(role))
            .await
            .map_err(|e| match e {
                MessengerError::PermissionDenied { party } => {
                    FlowError::CannotReachParty { party }
                }
                other => {
                    warn!(%party, error = %other, "terms prompt delivery failed");
                    FlowError::CannotReachParty { party }
                }
            })?;

        let reaction = self
            .messenger
            .await_reaction(message, party, &[ACCEPT_EMOJI, DECLINE_EMOJI], TERMS_TIMEOUT)
            .await;

        match reaction {
            Ok(emoji) if emoji == ACCEPT_EMOJI => {
                let user = self.ledger.users().ensure(party).await?;

                // cleanup only; acceptance is already durable
                if let Err(e) = self
                    .messenger
                    .remove_reactions(message, &[ACCEPT_EMOJI, DECLINE_EMOJI])
                    .await
                {
                    debug!(%party, error = %e, "could not tidy terms prompt");
                }

                debug!(%party, "terms accepted");

                Ok(user)
            }
            Ok(_) => Err(FlowError::TermsNotAccepted {
                party,
                reason: TermsFailure::Declined,
            }),
            Err(MessengerError::TimedOut) => Err(FlowError::TermsNotAccepted {
                party,
                reason: TermsFailure::TimedOut,
            }),
            Err(MessengerError::PermissionDenied { party }) => {
                Err(FlowError::CannotReachParty { party })
            }
            Err(other) => {
                warn!(%party, error = %other, "terms reaction wait failed");
                Err(FlowError::CannotReachParty { party })
            }
        }
    }
}
