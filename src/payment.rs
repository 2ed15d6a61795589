use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{Donation, DonationStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub status: DonationStatus,
    pub payment_id: Option<String>,
}

/// Settles a pending donation.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn charge(&self, donation: &Donation) -> Result<PaymentOutcome>;
}

/// Stand-in provider: waits, then reports success. No money moves.
pub struct SimulatedPayment {
    delay: Duration,
}

impl SimulatedPayment {
    pub fn new(delay: Duration) -> Self {
        SimulatedPayment { delay }
    }
}

#[async_trait]
impl PaymentProvider for SimulatedPayment {
    async fn charge(&self, donation: &Donation) -> Result<PaymentOutcome> {
        tracing::info!(donation = %donation.id, amount = %donation.amount, method = %donation.payment_method, "Simulating payment.");
        tokio::time::sleep(self.delay).await;

        Ok(PaymentOutcome {
            status: DonationStatus::Success,
            payment_id: Some(format!("sim_{}", crate::model::new_document_id())),
        })
    }
}
