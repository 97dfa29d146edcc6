use serde::Serialize;

/// Ports the local node listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ports {
    pub api: u16,
    pub gateway: u16,
    pub swarm: u16,
}

impl Ports {
    pub fn gateway_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.gateway)
    }

    pub fn api_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.api)
    }

    pub fn webui_url(&self) -> String {
        format!("http://127.0.0.1:{}/webui", self.api)
    }
}

impl Default for Ports {
    fn default() -> Self {
        Self {
            api: 5981,
            gateway: 18181,
            swarm: 4001,
        }
    }
}
