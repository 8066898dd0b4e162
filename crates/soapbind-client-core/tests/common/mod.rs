#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::sync::{Arc, Mutex, PoisonError};

use soapbind_client_core::transport::{Connection, HttpRequest, HttpResponse, TransportError, TransportFactory, TransportOptions};
use url::Url;

pub const URL: &str = "http://vc.example.com/sdk";

#[derive(Debug, Default)]
struct Script {
    responses: VecDeque<HttpResponse>,
    requests: Vec<HttpRequest>,
    connects: usize,
}

/// Serves canned responses in order and records every request, across connections.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<HttpResponse>) -> Self {
        let transport = Self::default();
        for response in responses {
            transport.push(response);
        }
        transport
    }

    pub fn push(&self, response: HttpResponse) {
        self.lock().responses.push_back(response);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    pub fn last_body(&self) -> String {
        self.lock()
            .requests
            .last()
            .map(|r| String::from_utf8_lossy(&r.body).into_owned())
            .unwrap_or_default()
    }

    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransportFactory for ScriptedTransport {
    fn connect(&self, _url: &Url, _options: &TransportOptions) -> Result<Box<dyn Connection>, TransportError> {
        self.lock().connects += 1;
        Ok(Box::new(ScriptedConnection {
            transport: self.clone(),
        }))
    }
}

#[derive(Debug)]
struct ScriptedConnection {
    transport: ScriptedTransport,
}

impl Connection for ScriptedConnection {
    fn send_request(&mut self, request: &HttpRequest) -> Result<(), TransportError> {
        self.transport.lock().requests.push(request.clone());
        Ok(())
    }

    fn read_response(&mut self) -> Result<HttpResponse, TransportError> {
        self.transport
            .lock()
            .responses
            .pop_front()
            .ok_or(TransportError::Closed)
    }
}

pub fn response(status: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
    HttpResponse {
        status,
        reason: String::new(),
        headers: headers
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect(),
        body: body.as_bytes().to_vec(),
    }
}

pub fn soap_response(status: u16, body: &str) -> HttpResponse {
    response(status, &[("Content-Type", r#"text/xml; charset="utf-8""#)], body)
}

pub fn resource(name: &str) -> String {
    fs::read_to_string(format!("tests/resources/{name}")).expect("Failed to read test resource")
}
