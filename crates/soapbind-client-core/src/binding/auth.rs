use std::fmt;

use base64::Engine;
use bitflags::bitflags;
use soapbind_protocol::{QName, SoapWriter, ns};
use soapbind_xml::builder::Element;

bitflags! {
    /// Authentication applied to each request. HTTP and header styles combine freely.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AuthStyle: u8 {
        /// `Authorization: Basic` on every request.
        const HTTP_BASIC = 0b0001;

        /// RFC 2617 digest, answered after the server's 401 challenge.
        const HTTP_DIGEST = 0b0010;

        /// `BasicAuth` element in the SOAP header.
        const HEADER_BASIC = 0b0100;
    }
}

impl AuthStyle {
    pub const NONE: Self = Self::empty();
}

/// User name and password. The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// `Authorization` value for HTTP Basic.
    /// WARNING: never log the result.
    pub fn basic_authorization(&self) -> String {
        let creds = format!("{}:{}", self.user, self.password);
        let b64 = base64::engine::general_purpose::STANDARD.encode(creds.as_bytes());
        format!("Basic {b64}")
    }

    /// `<zsi:BasicAuth><zsi:Name/><zsi:Password/></zsi:BasicAuth>`, always untyped.
    pub fn header_element(&self, sw: &mut SoapWriter) -> Element<'static> {
        let name = sw
            .element(&QName::new(ns::ZSI, "Name"))
            .set_text(self.user.clone());
        let password = sw
            .element(&QName::new(ns::ZSI, "Password"))
            .set_text(self.password.clone());
        sw.element(&QName::new(ns::ZSI, "BasicAuth"))
            .add_child(name)
            .add_child(password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}
