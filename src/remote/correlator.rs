//! Transport-remote: call/return correlation over an unreliable batched
//! transport (§4.4). Grounded on the teacher crate's `broker::in_memory`
//! correlation map (a `DashMap` of pending requests keyed by correlation id,
//! resolved by an incoming reply) generalized from request-reply-with-type
//! to the distilled spec's call/return envelope shape.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::aborter::Aborter;
use crate::error::{ActionError, FrameworkErrorCode};
use crate::transport::{Transport, TransportSendError};
use crate::wire::{self, CallKind, EnvelopeBody, Variant, WireEnvelope};

/// Hard per-call timeout (§3 "Pending call" lifecycle, §5 cancellation).
pub const CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// What a local container produced (or failed with) for an incoming call.
#[async_trait]
pub trait LocalDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        actor_type: &str,
        id_parts: &[String],
        action_name: &str,
        args: Vec<Variant>,
        lazy: bool,
    ) -> Result<Option<Variant>, ActionError>;
}

/// The resolved outcome of one `invoke` attempt, mirroring §4.4's incoming
/// `kind = return` handling: either a transport-level failure or whatever
/// content (result or application/framework error) the remote returned.
#[derive(Debug, Clone)]
pub enum InvokeOutcome {
    TransportFailure {
        code: FrameworkErrorCode,
        message: String,
    },
    Content {
        result: Option<Variant>,
        error: Option<ActionError>,
    },
}

pub struct InvokeRequest {
    pub destination: String,
    pub actor_type: String,
    pub id_parts: Vec<String>,
    pub action_name: String,
    pub args: Vec<Variant>,
    pub lazy: bool,
    pub aborter: Option<Aborter>,
}

struct PendingCall {
    resolve: oneshot::Sender<InvokeOutcome>,
}

/// Call/return correlator for one app process.
pub struct TransportRemote<T: Transport> {
    app_id: String,
    transport: Arc<T>,
    pending: Arc<DashMap<String, PendingCall>>,
    dispatcher: Arc<dyn LocalDispatcher>,
}

impl<T: Transport + 'static> TransportRemote<T> {
    pub fn new(app_id: impl Into<String>, transport: Arc<T>, dispatcher: Arc<dyn LocalDispatcher>) -> Self {
        Self {
            app_id: app_id.into(),
            transport,
            pending: Arc::new(DashMap::new()),
            dispatcher,
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Outgoing: §4.4 "Outgoing" pipeline.
    pub async fn invoke(&self, request: InvokeRequest) -> InvokeOutcome {
        let call_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(call_id.clone(), PendingCall { resolve: tx });

        let envelope = WireEnvelope {
            receiver: request.destination.clone(),
            return_address: Some(self.app_id.clone()),
            failure_code: None,
            failure_message: None,
            correlation_ids: None,
            parent_uid: None,
            call_id: call_id.clone(),
            body: EnvelopeBody::Call {
                lazy: request.lazy,
                actor_type: request.actor_type,
                action_name: request.action_name,
                id_parts: request.id_parts,
                args: request.args,
            },
        };
        let frame = wire::encode(&envelope);

        if let Err(send_err) = self.transport.send(&request.destination, frame).await {
            self.pending.remove(&call_id);
            let code = match send_err {
                TransportSendError::NoAck => FrameworkErrorCode::NoAck,
                TransportSendError::UnknownReceiver(_) | TransportSendError::Other(_) => {
                    FrameworkErrorCode::TransportError
                }
            };
            return InvokeOutcome::TransportFailure {
                code,
                message: send_err.to_string(),
            };
        }

        let timeout = tokio::time::sleep(CALL_TIMEOUT);
        tokio::pin!(timeout);

        let outcome = if let Some(aborter) = request.aborter.clone() {
            tokio::select! {
                result = rx => result.unwrap_or(InvokeOutcome::TransportFailure {
                    code: FrameworkErrorCode::TransportError,
                    message: "pending call dropped".to_string(),
                }),
                _ = &mut timeout => InvokeOutcome::TransportFailure {
                    code: FrameworkErrorCode::TransportCallTimeout,
                    message: "call timed out after 60s".to_string(),
                },
                _ = aborter.aborted() => InvokeOutcome::TransportFailure {
                    code: FrameworkErrorCode::TransportCallInterrupted,
                    message: "call aborted by caller".to_string(),
                },
            }
        } else {
            tokio::select! {
                result = rx => result.unwrap_or(InvokeOutcome::TransportFailure {
                    code: FrameworkErrorCode::TransportError,
                    message: "pending call dropped".to_string(),
                }),
                _ = &mut timeout => InvokeOutcome::TransportFailure {
                    code: FrameworkErrorCode::TransportCallTimeout,
                    message: "call timed out after 60s".to_string(),
                },
            }
        };

        self.pending.remove(&call_id);
        outcome
    }

    /// Drives the receive loop: call this in a background task per app.
    pub async fn run_receive_loop(self: Arc<Self>) {
        while let Some(frame) = self.transport.recv().await {
            let this = self.clone();
            tokio::spawn(async move {
                this.handle_frame(&frame).await;
            });
        }
    }

    /// Incoming: §4.4 "Incoming" pipeline, exposed directly for tests that
    /// want to drive delivery without a background task.
    pub async fn handle_frame(&self, frame: &[u8]) {
        let envelope = match wire::decode(frame) {
            Ok(e) => e,
            Err(_) => return,
        };
        match envelope.kind() {
            CallKind::Return => self.handle_return(envelope),
            CallKind::Call => self.handle_call(envelope).await,
        }
    }

    fn handle_return(&self, envelope: WireEnvelope) {
        let Some((_, pending)) = self.pending.remove(&envelope.call_id) else {
            return;
        };
        let outcome = if let Some(code) = envelope.failure_code {
            InvokeOutcome::TransportFailure {
                code: FrameworkErrorCode::TransportError,
                message: envelope.failure_message.unwrap_or(code),
            }
        } else if let EnvelopeBody::Return { result, error } = envelope.body {
            InvokeOutcome::Content { result, error }
        } else {
            InvokeOutcome::TransportFailure {
                code: FrameworkErrorCode::TransportError,
                message: "return envelope carried a call body".to_string(),
            }
        };
        let _ = pending.resolve.send(outcome);
    }

    async fn handle_call(&self, envelope: WireEnvelope) {
        let WireEnvelope {
            call_id,
            return_address,
            body,
            ..
        } = envelope;
        let Some(return_address) = return_address else { return };
        let EnvelopeBody::Call {
            lazy,
            actor_type,
            action_name,
            id_parts,
            args,
        } = body
        else {
            return;
        };

        let (result, error) = match self
            .dispatcher
            .dispatch(&actor_type, &id_parts, &action_name, args, lazy)
            .await
        {
            Ok(value) => (value, None),
            Err(err) => (None, Some(err)),
        };

        let response = WireEnvelope {
            receiver: return_address.clone(),
            return_address: Some(self.app_id.clone()),
            failure_code: None,
            failure_message: None,
            correlation_ids: None,
            parent_uid: None,
            call_id,
            body: EnvelopeBody::Return { result, error },
        };
        let _ = self.transport.send(&return_address, wire::encode(&response)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackNetwork;
    use std::sync::Mutex;

    struct EchoDispatcher {
        last_args: Mutex<Vec<Variant>>,
    }

    #[async_trait]
    impl LocalDispatcher for EchoDispatcher {
        async fn dispatch(
            &self,
            _actor_type: &str,
            _id_parts: &[String],
            action_name: &str,
            args: Vec<Variant>,
            _lazy: bool,
        ) -> Result<Option<Variant>, ActionError> {
            if action_name == "boom" {
                return Err(ActionError::framework(FrameworkErrorCode::UnknownAction, "boom"));
            }
            *self.last_args.lock().unwrap() = args.clone();
            Ok(args.into_iter().next())
        }
    }

    #[tokio::test]
    async fn round_trip_call_resolves_with_result() {
        let net = LoopbackNetwork::new();
        let transport0 = Arc::new(net.register("app0"));
        let transport1 = Arc::new(net.register("app1"));

        let remote0 = Arc::new(TransportRemote::new(
            "app0",
            transport0,
            Arc::new(EchoDispatcher {
                last_args: Mutex::new(Vec::new()),
            }),
        ));
        let remote1 = Arc::new(TransportRemote::new(
            "app1",
            transport1,
            Arc::new(EchoDispatcher {
                last_args: Mutex::new(Vec::new()),
            }),
        ));
        tokio::spawn(remote1.clone().run_receive_loop());
        tokio::spawn(remote0.clone().run_receive_loop());

        let outcome = remote0
            .invoke(InvokeRequest {
                destination: "app1".into(),
                actor_type: "echoactor".into(),
                id_parts: vec!["x".into()],
                action_name: "echo".into(),
                args: vec![Variant::Str("Hello".into())],
                lazy: false,
                aborter: None,
            })
            .await;

        match outcome {
            InvokeOutcome::Content { result, error } => {
                assert_eq!(result, Some(Variant::Str("Hello".into())));
                assert!(error.is_none());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn sending_to_unregistered_app_resolves_transport_error() {
        let net = LoopbackNetwork::new();
        let transport0 = Arc::new(net.register("app0"));
        let remote0 = Arc::new(TransportRemote::new(
            "app0",
            transport0,
            Arc::new(EchoDispatcher {
                last_args: Mutex::new(Vec::new()),
            }),
        ));

        let outcome = remote0
            .invoke(InvokeRequest {
                destination: "ghost".into(),
                actor_type: "echoactor".into(),
                id_parts: vec!["x".into()],
                action_name: "echo".into(),
                args: vec![],
                lazy: false,
                aborter: None,
            })
            .await;

        match outcome {
            InvokeOutcome::TransportFailure { code, .. } => {
                assert_eq!(code, FrameworkErrorCode::TransportError);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn abort_before_response_yields_call_interrupted() {
        let net = LoopbackNetwork::new();
        let transport0 = Arc::new(net.register("app0"));
        // app1 registered but its receive loop never runs, so the call hangs
        // until aborted.
        let _transport1 = net.register("app1");
        let remote0 = Arc::new(TransportRemote::new(
            "app0",
            transport0,
            Arc::new(EchoDispatcher {
                last_args: Mutex::new(Vec::new()),
            }),
        ));

        let aborter = Aborter::new();
        let aborter_clone = aborter.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            aborter_clone.abort();
        });

        let outcome = remote0
            .invoke(InvokeRequest {
                destination: "app1".into(),
                actor_type: "echoactor".into(),
                id_parts: vec!["x".into()],
                action_name: "echo".into(),
                args: vec![],
                lazy: false,
                aborter: Some(aborter),
            })
            .await;

        match outcome {
            InvokeOutcome::TransportFailure { code, .. } => {
                assert_eq!(code, FrameworkErrorCode::TransportCallInterrupted);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatcher_framework_error_propagates_verbatim() {
        let net = LoopbackNetwork::new();
        let transport0 = Arc::new(net.register("app0"));
        let transport1 = Arc::new(net.register("app1"));
        let remote0 = Arc::new(TransportRemote::new(
            "app0",
            transport0,
            Arc::new(EchoDispatcher {
                last_args: Mutex::new(Vec::new()),
            }),
        ));
        let remote1 = Arc::new(TransportRemote::new(
            "app1",
            transport1,
            Arc::new(EchoDispatcher {
                last_args: Mutex::new(Vec::new()),
            }),
        ));
        tokio::spawn(remote1.clone().run_receive_loop());
        tokio::spawn(remote0.clone().run_receive_loop());

        let outcome = remote0
            .invoke(InvokeRequest {
                destination: "app1".into(),
                actor_type: "echoactor".into(),
                id_parts: vec!["x".into()],
                action_name: "boom".into(),
                args: vec![],
                lazy: false,
                aborter: None,
            })
            .await;

        match outcome {
            InvokeOutcome::Content { error: Some(err), .. } => {
                assert_eq!(err.as_framework().unwrap().code, FrameworkErrorCode::UnknownAction);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
