use serde::Serialize;

use super::transfer::TransferMethod;

/// A request body the transport can send.
///
/// The serialized form becomes the JSON body; `config_id` travels in a
/// header instead and must be skipped by the serializer.
pub trait ApiRequest: Serialize + Send + Sync {
    fn config_id(&self) -> Option<&str> { None }

    fn transfer_method(&self) -> Option<TransferMethod> { None }
}

/// Fields shared by every request. Service request types embed it with
/// `#[serde(flatten)]` and forward the [`ApiRequest`] accessors to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BaseRequest {
    #[serde(skip)]
    pub config_id:       Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_method: Option<TransferMethod>,
}

impl BaseRequest {
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn with_config_id(mut self, config_id: impl Into<String>) -> Self {
        self.config_id = Some(config_id.into());
        self
    }

    #[must_use]
    pub fn with_transfer_method(mut self, method: TransferMethod) -> Self {
        self.transfer_method = Some(method);
        self
    }
}

impl ApiRequest for BaseRequest {
    fn config_id(&self) -> Option<&str> { self.config_id.as_deref() }

    fn transfer_method(&self) -> Option<TransferMethod> { self.transfer_method }
}

/// Untyped bodies. `transfer_method` is read back out of the JSON; there is
/// no way to carry a config id, so none is reported.
impl ApiRequest for serde_json::Value {
    fn transfer_method(&self) -> Option<TransferMethod> {
        self.get("transfer_method")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }
}

impl<T: ApiRequest + ?Sized> ApiRequest for &T {
    fn config_id(&self) -> Option<&str> { (**self).config_id() }

    fn transfer_method(&self) -> Option<TransferMethod> { (**self).transfer_method() }
}
