use crate::services::email_service::{EmailService, OutgoingEmail};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, Semaphore},
    task::JoinHandle,
};

/// Messages that may wait for a free sender before new ones are dropped.
pub const MAIL_QUEUE_CAPACITY: usize = 256;
/// Sends that may be in flight at once.
pub const MAX_CONCURRENT_SENDS: usize = 8;

/// Fire-and-forget handle for outgoing mail.
///
/// Messages go onto a bounded queue. A worker task hands each one to its own
/// send task, with at most [`MAX_CONCURRENT_SENDS`] running and each bounded by
/// the send timeout. A full queue drops the message with a warning; the caller
/// never waits on delivery.
#[derive(Clone)]
pub struct MailDispatcher {
    sender: mpsc::Sender<OutgoingEmail>,
}

impl MailDispatcher {
    /// Starts the worker. The worker exits once every dispatcher clone is
    /// dropped and all in-flight sends have finished.
    pub fn spawn(
        email_service: Arc<dyn EmailService>,
        send_timeout: Duration,
    ) -> (Self, JoinHandle<()>) {
        Self::spawn_with_limits(
            email_service,
            send_timeout,
            MAIL_QUEUE_CAPACITY,
            MAX_CONCURRENT_SENDS,
        )
    }

    pub fn spawn_with_limits(
        email_service: Arc<dyn EmailService>,
        send_timeout: Duration,
        queue_capacity: usize,
        max_concurrent_sends: usize,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let worker = tokio::spawn(run_worker(
            email_service,
            receiver,
            send_timeout,
            max_concurrent_sends.max(1),
        ));
        (Self { sender }, worker)
    }

    pub fn dispatch(&self, email: OutgoingEmail) {
        match self.sender.try_send(email) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(email)) => {
                tracing::warn!(
                    "Mail queue is full; dropping \"{}\" email to {}",
                    email.subject,
                    email.to
                );
            }
            Err(mpsc::error::TrySendError::Closed(email)) => {
                tracing::error!("Mail worker is gone; dropping email to {}", email.to);
            }
        }
    }
}

async fn run_worker(
    email_service: Arc<dyn EmailService>,
    mut receiver: mpsc::Receiver<OutgoingEmail>,
    send_timeout: Duration,
    max_concurrent_sends: usize,
) {
    let permits = Arc::new(Semaphore::new(max_concurrent_sends));

    while let Some(email) = receiver.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let email_service = email_service.clone();
        tokio::spawn(async move {
            deliver(email_service.as_ref(), &email, send_timeout).await;
            drop(permit);
        });
    }

    // Wait for the sends still in flight.
    let _ = permits.acquire_many(max_concurrent_sends as u32).await;
    tracing::debug!("Mail worker stopped");
}

async fn deliver(email_service: &dyn EmailService, email: &OutgoingEmail, send_timeout: Duration) {
    match tokio::time::timeout(send_timeout, email_service.send(email)).await {
        Ok(Ok(())) => {
            tracing::info!("Sent \"{}\" email to {}", email.subject, email.to);
        }
        Ok(Err(e)) => {
            tracing::error!(
                "Failed to send \"{}\" email to {}: {}",
                email.subject,
                email.to,
                e
            );
        }
        Err(_) => {
            tracing::warn!(
                "Timed out after {:?} sending \"{}\" email to {}",
                send_timeout,
                email.subject,
                email.to
            );
        }
    }
}
