//! Request/reply over broker queues.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::Reply;
use crate::broker::{Broker, Delivery, Subscription};
use crate::error::ServiceError;

/// Caller side of the request/reply operations.
///
/// Every call publishes its request with a fresh correlation id and this
/// client's private reply queue, then waits for the reply carrying the same
/// id. Replies with any other id are stale and dropped. Calls made through
/// one client run one at a time.
pub struct RpcClient {
    broker: Arc<dyn Broker>,
    reply_to: String,
    replies: Mutex<Subscription>,
    timeout: Duration,
}

impl RpcClient {
    pub async fn connect(broker: Arc<dyn Broker>, timeout: Duration) -> Result<Self, ServiceError> {
        let replies = broker.declare_exclusive().await?;
        Ok(Self {
            reply_to: replies.name().to_string(),
            broker,
            replies: Mutex::new(replies),
            timeout,
        })
    }

    /// Name of the private reply queue.
    pub fn reply_queue(&self) -> &str {
        &self.reply_to
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn broker(&self) -> &Arc<dyn Broker> {
        &self.broker
    }

    /// Call `queue` with the default deadline.
    pub async fn call<Req, Resp>(&self, queue: &str, request: &Req) -> Result<Resp, ServiceError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Reply,
    {
        self.call_until(queue, request, self.timeout, &CancellationToken::new())
            .await
    }

    /// Call `queue`, giving up after `timeout` or once `cancel` fires.
    ///
    /// A response whose `error` field is set becomes the matching
    /// [`ServiceError`].
    pub async fn call_until<Req, Resp>(
        &self,
        queue: &str,
        request: &Req,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Resp, ServiceError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Reply,
    {
        let mut replies = self.replies.lock().await;
        let id = Uuid::new_v4();
        let delivery = Delivery::json(request)?
            .with_correlation(Some(id))
            .with_reply_to(self.reply_to.clone());
        trace!("calling {} ({})", queue, id);
        self.broker.publish(queue, delivery).await?;

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                biased;
                reply = replies.recv() => {
                    let Some(reply) = reply else {
                        return Err(ServiceError::Transport("reply queue closed".into()));
                    };
                    if reply.correlation_id != Some(id) {
                        debug!("dropping stale reply {:?} on {}", reply.correlation_id, self.reply_to);
                        continue;
                    }
                    let resp: Resp = reply.decode()?;
                    if let Some(err) = resp.error() {
                        return Err(ServiceError::from_wire(err));
                    }
                    return Ok(resp);
                }
                _ = cancel.cancelled() => {
                    debug!("call to {} cancelled", queue);
                    return Err(ServiceError::Cancelled);
                }
                _ = &mut deadline => {
                    debug!("call to {} timed out after {:?}", queue, timeout);
                    return Err(ServiceError::Timeout);
                }
            }
        }
    }
}
