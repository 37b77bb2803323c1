//! External status sink port.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hookflow_types::error::DeliveryError;
use hookflow_types::status::StatusUpdate;
use secrecy::SecretString;

/// Publishes a status update to the location named by a callback sink.
pub trait StatusSink: Send + Sync {
    fn set_status(
        &self,
        callback_sink: &str,
        update: &StatusUpdate,
        credential: &SecretString,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Object-safe version of [`StatusSink`] with boxed futures.
pub trait StatusSinkDyn: Send + Sync {
    fn set_status_boxed<'a>(
        &'a self,
        callback_sink: &'a str,
        update: &'a StatusUpdate,
        credential: &'a SecretString,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>>;
}

impl<T: StatusSink> StatusSinkDyn for T {
    fn set_status_boxed<'a>(
        &'a self,
        callback_sink: &'a str,
        update: &'a StatusUpdate,
        credential: &'a SecretString,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>> {
        Box::pin(self.set_status(callback_sink, update, credential))
    }
}

pub type DynStatusSink = Arc<dyn StatusSinkDyn>;
