//! Payout address collection
//!
//! Resolves the address a party should be paid at for a currency: the
//! saved one if they have it on file, otherwise a DM prompt with a short
//! reply window. After a fresh address comes in, a detached task offers
//! to save it for next time; that offer never blocks the caller.

use mediary_ledger::LedgerError;
use mediary_types::{Currency, PartyId};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{FlowError, FlowResult};
use crate::messenger::MessengerError;
use crate::{FlowOrchestrator, SAVE_EMOJI};

/// How long a party has to reply with an address.
pub const ADDRESS_REPLY_TIMEOUT: Duration = Duration::from_secs(60);

/// How long the save-for-later offer stays open.
pub const SAVE_ADDRESS_TIMEOUT: Duration = Duration::from_secs(5 * 60);

impl FlowOrchestrator {
    /// Resolve the payout address for `party` in `currency`.
    ///
    /// Returns the saved address when one is on file. Otherwise prompts
    /// the party over DM and waits [`ADDRESS_REPLY_TIMEOUT`] for a reply;
    /// the reply is used as-is and a background task offers to save it.
    /// `amount` only flavors the prompt.
    pub async fn ensure_address(
        &self,
        party: PartyId,
        currency: Currency,
        amount: Decimal,
    ) -> FlowResult<String> {
        if let Some(saved) = self.ledger.addresses().for_currency(party, currency).await? {
            debug!(%party, %currency, "using saved address");
            return Ok(saved.address);
        }

        let prompt = format!(
            "Please reply with the {name} address where you want to receive {amount} {code}.",
            name = currency.name(),
            code = currency.code()
        );

        self.messenger
            .send_direct(party, &prompt)
            .await
            .map_err(|e| match e {
                MessengerError::PermissionDenied { party } => {
                    FlowError::CannotReachParty { party }
                }
                other => {
                    warn!(%party, error = %other, "address prompt delivery failed");
                    FlowError::CannotReachParty { party }
                }
            })?;

        let address = match self
            .messenger
            .await_reply(party, ADDRESS_REPLY_TIMEOUT)
            .await
        {
            Ok(reply) => reply.trim().to_string(),
            Err(MessengerError::TimedOut) => {
                return Err(FlowError::AddressNotSupplied { party, currency })
            }
            Err(MessengerError::PermissionDenied { party }) => {
                return Err(FlowError::CannotReachParty { party })
            }
            Err(other) => {
                warn!(%party, error = %other, "address reply wait failed");
                return Err(FlowError::AddressNotSupplied { party, currency });
            }
        };

        if address.is_empty() {
            return Err(FlowError::AddressNotSupplied { party, currency });
        }

        // Fire and forget: the payment must not wait on this.
        let this = self.clone();
        let offered = address.clone();
        tokio::spawn(async move {
            this.offer_to_save(party, currency, offered).await;
        });

        Ok(address)
    }

    async fn offer_to_save(&self, party: PartyId, currency: Currency, address: String) {
        let offer = format!(
            "React with \u{2705} within 5 minutes to save `{address}` as your {code} address for future payments.",
            code = currency.code()
        );

        let message = match self.messenger.send_direct(party, &offer).await {
            Ok(handle) => handle,
            Err(e) => {
                debug!(%party, error = %e, "save-address offer not delivered");
                return;
            }
        };

        match self
            .messenger
            .await_reaction(message, party, &[SAVE_EMOJI], SAVE_ADDRESS_TIMEOUT)
            .await
        {
            Ok(_) => {
                // saved addresses start out private
                match self
                    .ledger
                    .addresses()
                    .save(party, currency, &address, false)
                    .await
                {
                    Ok(_) => {
                        debug!(%party, %currency, "address saved");
                        let _ = self
                            .messenger
                            .send_direct(party, "Saved! I'll use this address next time.")
                            .await;
                    }
                    Err(LedgerError::AddressExists { .. }) => {
                        debug!(%party, %currency, "address already on file");
                    }
                    Err(e) => {
                        warn!(%party, %currency, error = %e, "failed to save address");
                    }
                }
            }
            Err(MessengerError::TimedOut) => {
                if let Err(e) = self.messenger.remove_reactions(message, &[SAVE_EMOJI]).await {
                    debug!(%party, error = %e, "could not tidy save-address offer");
                }
            }
            Err(e) => {
                debug!(%party, error = %e, "save-address offer abandoned");
            }
        }
    }
}
