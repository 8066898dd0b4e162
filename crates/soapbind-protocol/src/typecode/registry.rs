use std::sync::{Arc, OnceLock};

use crate::typecode::{
    TypeCode, XsdByte, XsdDouble, XsdFloat, XsdInt, XsdInteger, XsdLong, XsdNegativeInteger,
    XsdNonNegativeInteger, XsdNonPositiveInteger, XsdPositiveInteger, XsdShort, XsdString,
    XsdUnsignedByte, XsdUnsignedInt, XsdUnsignedLong, XsdUnsignedShort,
};
use crate::{NativeKind, ns};

/// The built-in simple typecodes, looked up by schema type or by native kind.
#[derive(Debug)]
pub struct Registry {
    typecodes: Vec<Arc<dyn TypeCode>>,
}

impl Registry {
    fn builtin() -> Self {
        let typecodes: Vec<Arc<dyn TypeCode>> = vec![
            Arc::new(XsdString::new()),
            Arc::new(XsdInt::new()),
            Arc::new(XsdLong::new()),
            Arc::new(XsdInteger::new()),
            Arc::new(XsdDouble::new()),
            Arc::new(XsdFloat::new()),
            Arc::new(XsdShort::new()),
            Arc::new(XsdByte::new()),
            Arc::new(XsdUnsignedByte::new()),
            Arc::new(XsdUnsignedShort::new()),
            Arc::new(XsdUnsignedInt::new()),
            Arc::new(XsdUnsignedLong::new()),
            Arc::new(XsdNegativeInteger::new()),
            Arc::new(XsdNonPositiveInteger::new()),
            Arc::new(XsdNonNegativeInteger::new()),
            Arc::new(XsdPositiveInteger::new()),
        ];
        Self { typecodes }
    }

    /// Typecode for an `xsi:type`. Schema and SOAP encoding namespaces of any vintage match.
    pub fn for_type(&self, namespace: Option<&str>, local: &str) -> Option<Arc<dyn TypeCode>> {
        if !namespace.is_none_or(is_schema_namespace) {
            return None;
        }

        self.typecodes
            .iter()
            .find(|tc| tc.parse_list().iter().any(|name| name == local))
            .cloned()
    }

    /// First typecode that claims `kind` in its serial list.
    pub fn for_native(&self, kind: NativeKind) -> Option<Arc<dyn TypeCode>> {
        self.typecodes
            .iter()
            .find(|tc| tc.serial_list().contains(&kind))
            .cloned()
    }
}

fn is_schema_namespace(namespace: &str) -> bool {
    namespace == ns::SOAP_ENC
        || (namespace.starts_with("http://www.w3.org/") && namespace.ends_with("/XMLSchema"))
}

pub fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(Registry::builtin)
}
