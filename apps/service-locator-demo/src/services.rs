use service_locator::{HostObject, LazyService, Provision, plain_service};

/// Formats messages. Plain: built with `Default` when first requested.
pub struct Greeter {
    signature: String,
}

impl Default for Greeter {
    fn default() -> Self {
        Self::signed("service-locator-demo")
    }
}

impl Greeter {
    pub fn signed(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
        }
    }

    pub fn greet(&self, message: &str) -> String {
        format!("{message} (from {})", self.signature)
    }
}

plain_service!(Greeter);

/// Prints on behalf of the host object it is attached to.
pub struct Console {
    host: HostObject,
}

impl Console {
    pub fn host(&self) -> &HostObject {
        &self.host
    }

    pub fn print(&self, line: &str) {
        println!("[{} {}] {line}", self.host.name(), self.host.id());
    }
}

impl LazyService for Console {
    fn provision() -> Provision<Self> {
        Provision::HostBound(|host| {
            Ok(Console {
                host: host.clone(),
            })
        })
    }
}
