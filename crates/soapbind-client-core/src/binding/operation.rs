use std::sync::Arc;

use soapbind_protocol::typecode::AnyType;
use soapbind_protocol::{QName, Value, ns};
use tracing::instrument;

use crate::binding::{Binding, Payload, ReceiveOptions, SendOptions};
use crate::error::SoapError;

/// A remote operation reached by name through a [`Binding`].
///
/// Calls are SOAP-encoded. Replies are decoded through the binding's reply types, or as
/// `xsd:anyType` without them.
#[derive(Debug, Clone)]
pub struct Operation<'b> {
    binding: &'b Binding,
    name: QName,
    send_options: SendOptions,
    receive_options: ReceiveOptions,
}

impl<'b> Operation<'b> {
    pub(crate) fn new(binding: &'b Binding, name: QName) -> Self {
        Self {
            binding,
            name,
            send_options: SendOptions::default(),
            receive_options: ReceiveOptions::default(),
        }
    }

    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Replaces the per-request settings. The encoding style stays SOAP encoding unless set here.
    pub fn with_send_options(mut self, options: SendOptions) -> Self {
        self.send_options = options;
        self
    }

    pub fn with_receive_options(mut self, options: ReceiveOptions) -> Self {
        self.receive_options = options;
        self
    }

    fn send_options(&self) -> SendOptions {
        let mut options = self.send_options.clone();
        if options.encoding_style.is_none() {
            options.encoding_style = Some(ns::SOAP_ENC.to_owned());
        }
        options
    }

    fn invoke(&self, payload: &Payload, options: &SendOptions) -> Result<Value, SoapError> {
        self.binding
            .rpc(None, &self.name, payload, None, options, &self.receive_options)
    }

    /// Calls with positional arguments, written as an anonymous sequence.
    #[instrument(name = "operation.call", level = "info", skip_all, fields(operation = %self.name, args = args.len()), err)]
    pub fn call(&self, args: Vec<Value>) -> Result<Value, SoapError> {
        self.invoke(&Payload::Native(Value::List(args)), &self.send_options())
    }

    /// Calls with named parameters, one child element per parameter in order.
    #[instrument(name = "operation.call_named", level = "info", skip_all, fields(operation = %self.name, params = params.len()), err)]
    pub fn call_named(&self, params: Vec<(String, Value)>) -> Result<Value, SoapError> {
        let mut options = self.send_options();
        if options.request_typecode.is_none() {
            options.request_typecode = Some(Arc::new(AnyType::new()));
        }
        self.invoke(&Payload::Native(Value::Struct(params)), &options)
    }
}
